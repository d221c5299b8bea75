use crate::node::{NodeId, NodeKind};
use crate::tree::RenderTree;
use skein_common::Value;

/// The boundary to a concrete document implementation. The runtime owns a
/// [`RenderTree`]; a host embeds it by implementing this trait and replaying
/// the tree into it after a render pass.
pub trait DocumentBackend {
    fn create_element(&mut self, id: NodeId, tag: &str);
    fn create_text(&mut self, id: NodeId, content: &str);
    fn set_attribute(&mut self, id: NodeId, name: &str, value: &str);
    fn set_style(&mut self, id: NodeId, name: &str, value: &str);
    fn set_data(&mut self, id: NodeId, name: &str, value: &Value);
    fn bind_event(&mut self, id: NodeId, event: &str);
    fn append_child(&mut self, parent: NodeId, child: NodeId);
}

/// Emits the whole tree into a backend in document order.
pub fn replay(tree: &RenderTree, backend: &mut dyn DocumentBackend) {
    emit(tree, tree.root(), None, backend);
}

fn emit(tree: &RenderTree, id: NodeId, parent: Option<NodeId>, backend: &mut dyn DocumentBackend) {
    let node = match tree.node(id) {
        Ok(n) => n,
        Err(_) => return,
    };
    match &node.kind {
        NodeKind::Element { tag } => backend.create_element(id, tag),
        NodeKind::Text { content } => backend.create_text(id, content),
    }
    for (name, value) in &node.attrs {
        backend.set_attribute(id, name, value);
    }
    for (name, value) in &node.styles {
        backend.set_style(id, name, value);
    }
    for (name, value) in &node.data {
        backend.set_data(id, name, value);
    }
    for event in &node.events {
        backend.bind_event(id, event);
    }
    if let Some(p) = parent {
        backend.append_child(p, id);
    }
    if let Ok(kids) = tree.children(id) {
        for k in kids.to_vec() {
            emit(tree, k, Some(id), backend);
        }
    }
}

/// Records backend calls as readable strings. Used in tests and useful for
/// debugging a host integration.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub ops: Vec<String>,
}

impl DocumentBackend for RecordingBackend {
    fn create_element(&mut self, id: NodeId, tag: &str) {
        self.ops.push(format!("element {:?} <{}>", id, tag));
    }

    fn create_text(&mut self, id: NodeId, content: &str) {
        self.ops.push(format!("text {:?} {:?}", id, content));
    }

    fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        self.ops.push(format!("attr {:?} {}={}", id, name, value));
    }

    fn set_style(&mut self, id: NodeId, name: &str, value: &str) {
        self.ops.push(format!("style {:?} {}:{}", id, name, value));
    }

    fn set_data(&mut self, id: NodeId, name: &str, value: &Value) {
        self.ops
            .push(format!("data {:?} {}={}", id, name, value.to_display_string()));
    }

    fn bind_event(&mut self, id: NodeId, event: &str) {
        self.ops.push(format!("event {:?} {}", id, event));
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.ops.push(format!("append {:?} -> {:?}", child, parent));
    }
}
