use skein_common::Value;
use std::collections::BTreeMap;

/// Identity of a node within one [`crate::RenderTree`].
///
/// Ids are never reused within a tree, so a stale id held across a removal
/// simply stops resolving instead of aliasing a new node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element { tag: String },
    Text { content: String },
}

/// One node of the owned render tree.
///
/// Maps use `BTreeMap` so that iteration (and backend replay) is
/// deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderNode {
    pub kind: NodeKind,
    pub attrs: BTreeMap<String, String>,
    pub styles: BTreeMap<String, String>,
    pub data: BTreeMap<String, Value>,
    pub events: Vec<String>,
    /// Wrapper nodes are transient structure inserted around existing
    /// content (pseudo-hook boundaries, enchantments). Unwrapping restores
    /// the original child sequence.
    pub is_wrapper: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl RenderNode {
    pub(crate) fn element(tag: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Element { tag: tag.into() },
            attrs: BTreeMap::new(),
            styles: BTreeMap::new(),
            data: BTreeMap::new(),
            events: Vec::new(),
            is_wrapper: false,
            parent: None,
            children: Vec::new(),
        }
    }

    pub(crate) fn text(content: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Text {
                content: content.into(),
            },
            attrs: BTreeMap::new(),
            styles: BTreeMap::new(),
            data: BTreeMap::new(),
            events: Vec::new(),
            is_wrapper: false,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag } => Some(tag),
            NodeKind::Text { .. } => None,
        }
    }

    pub fn text_value(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text { content } => Some(content),
            NodeKind::Element { .. } => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn style(&self, name: &str) -> Option<&str> {
        self.styles.get(name).map(String::as_str)
    }
}
