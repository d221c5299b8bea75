use crate::node::{NodeId, NodeKind, RenderNode};
use skein_common::Value;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomError {
    #[error("node {0:?} is not in the tree")]
    NodeNotFound(NodeId),

    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0:?} is not a text node")]
    NotText(NodeId),

    #[error("node {0:?} has no parent")]
    Detached(NodeId),

    #[error("invalid child range {start}..{end} for node {parent:?}")]
    InvalidRange {
        parent: NodeId,
        start: usize,
        end: usize,
    },
}

pub type DomResult<T> = Result<T, DomError>;

/// A literal text occurrence located within one parent element's contiguous
/// run of text children. `end_offset` is the match end in the scope-wide
/// text-content coordinate space, used to resume non-overlapping scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMatch {
    pub parent: NodeId,
    pub start_node: NodeId,
    pub start_byte: usize,
    pub end_node: NodeId,
    pub end_byte: usize,
    pub end_offset: usize,
}

/// The owned render tree.
///
/// This is the single shared mutable resource of a render pass: all
/// insertion, wrapping and unwrapping happens on this structure, and a thin
/// adapter (see [`crate::backend`]) translates it to the real document tree
/// at the boundary.
#[derive(Debug, Clone)]
pub struct RenderTree {
    nodes: HashMap<NodeId, RenderNode>,
    next: u64,
    root: NodeId,
}

impl RenderTree {
    pub fn new(root_tag: &str) -> Self {
        let mut tree = Self {
            nodes: HashMap::new(),
            next: 0,
            root: NodeId(0),
        };
        tree.root = tree.alloc(RenderNode::element(root_tag));
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn alloc(&mut self, node: RenderNode) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        self.nodes.insert(id, node);
        id
    }

    /// Creates a detached element node.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(RenderNode::element(tag))
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.alloc(RenderNode::text(content))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> DomResult<&RenderNode> {
        self.nodes.get(&id).ok_or(DomError::NodeNotFound(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> DomResult<&mut RenderNode> {
        self.nodes.get_mut(&id).ok_or(DomError::NodeNotFound(id))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> DomResult<&[NodeId]> {
        Ok(&self.node(id)?.children)
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(
            self.nodes.get(&id).map(|n| &n.kind),
            Some(NodeKind::Text { .. })
        )
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(
            self.nodes.get(&id).map(|n| &n.kind),
            Some(NodeKind::Element { .. })
        )
    }

    /// Detaches `child` from any current parent and appends it to `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let len = self.children(parent)?.len();
        self.insert_child(parent, len, child)
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> DomResult<()> {
        if !self.contains(child) {
            return Err(DomError::NodeNotFound(child));
        }
        if !self.is_element(parent) {
            return Err(DomError::NotAnElement(parent));
        }
        self.detach(child)?;
        let p = self.node_mut(parent)?;
        if index > p.children.len() {
            return Err(DomError::InvalidRange {
                parent,
                start: index,
                end: index,
            });
        }
        p.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Removes `id` from its parent's child list without dropping it.
    pub fn detach(&mut self, id: NodeId) -> DomResult<()> {
        let parent = match self.node(id)?.parent {
            Some(p) => p,
            None => return Ok(()),
        };
        let p = self.node_mut(parent)?;
        p.children.retain(|&c| c != id);
        self.node_mut(id)?.parent = None;
        Ok(())
    }

    /// Detaches `id` and drops it together with its whole subtree.
    pub fn remove(&mut self, id: NodeId) -> DomResult<()> {
        self.detach(id)?;
        for d in self.descendants(id) {
            self.nodes.remove(&d);
        }
        self.nodes.remove(&id);
        Ok(())
    }

    pub fn clear_children(&mut self, id: NodeId) -> DomResult<()> {
        let kids = self.children(id)?.to_vec();
        for k in kids {
            self.remove(k)?;
        }
        Ok(())
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let node = self.node_mut(id)?;
        if node.tag().is_none() {
            return Err(DomError::NotAnElement(id));
        }
        node.attrs.insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn set_style(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let node = self.node_mut(id)?;
        if node.tag().is_none() {
            return Err(DomError::NotAnElement(id));
        }
        node.styles.insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn set_data(&mut self, id: NodeId, name: &str, value: Value) -> DomResult<()> {
        let node = self.node_mut(id)?;
        if node.tag().is_none() {
            return Err(DomError::NotAnElement(id));
        }
        node.data.insert(name.to_string(), value);
        Ok(())
    }

    pub fn bind_event(&mut self, id: NodeId, event: &str) -> DomResult<()> {
        let node = self.node_mut(id)?;
        if node.tag().is_none() {
            return Err(DomError::NotAnElement(id));
        }
        if !node.events.iter().any(|e| e == event) {
            node.events.push(event.to_string());
        }
        Ok(())
    }

    /// All nodes strictly below `id`, in document (pre-) order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(&id) {
            Some(n) => n.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(cur) = stack.pop() {
            out.push(cur);
            if let Some(n) = self.nodes.get(&cur) {
                stack.extend(n.children.iter().rev().copied());
            }
        }
        out
    }

    /// Elements below (or at) `scope` matching a tag and attribute value, in
    /// document order. Used to resolve named hook anchors.
    pub fn find_by_tag_attr(
        &self,
        scope: NodeId,
        tag: &str,
        attr: &str,
        value: &str,
    ) -> Vec<NodeId> {
        let mut ids = vec![scope];
        ids.extend(self.descendants(scope));
        ids.retain(|&id| {
            self.nodes
                .get(&id)
                .map(|n| n.tag() == Some(tag) && n.attr(attr) == Some(value))
                .unwrap_or(false)
        });
        ids
    }

    /// Concatenated text of the subtree rooted at `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut ids = vec![id];
        ids.extend(self.descendants(id));
        for n in ids {
            if let Some(NodeKind::Text { content }) = self.nodes.get(&n).map(|n| &n.kind) {
                out.push_str(content);
            }
        }
        out
    }

    /// Splits a text node at byte position `at`, inserting the right half
    /// directly after it. Returns the new right node.
    pub fn split_text(&mut self, id: NodeId, at: usize) -> DomResult<NodeId> {
        let parent = self.parent(id).ok_or(DomError::Detached(id))?;
        let rest = match &mut self.node_mut(id)?.kind {
            NodeKind::Text { content } => content.split_off(at),
            NodeKind::Element { .. } => return Err(DomError::NotText(id)),
        };
        let right = self.create_text(&rest);
        let idx = self.child_index(parent, id)?;
        self.insert_child(parent, idx + 1, right)?;
        Ok(right)
    }

    fn child_index(&self, parent: NodeId, child: NodeId) -> DomResult<usize> {
        self.children(parent)?
            .iter()
            .position(|&c| c == child)
            .ok_or(DomError::NodeNotFound(child))
    }

    /// Wraps `parent`'s children in `start..end` in a new wrapper element
    /// placed at `start`. The wrapper carries the `is_wrapper` marker.
    pub fn wrap_children(
        &mut self,
        parent: NodeId,
        start: usize,
        end: usize,
        tag: &str,
    ) -> DomResult<NodeId> {
        let kids = self.children(parent)?;
        if start > end || end > kids.len() {
            return Err(DomError::InvalidRange { parent, start, end });
        }
        let wrapped: Vec<NodeId> = kids[start..end].to_vec();
        let wrapper = self.create_element(tag);
        self.node_mut(wrapper)?.is_wrapper = true;
        self.insert_child(parent, start, wrapper)?;
        for k in wrapped {
            self.append_child(wrapper, k)?;
        }
        Ok(wrapper)
    }

    /// Replaces a wrapper with its children, splicing them back into the
    /// parent at the wrapper's position.
    pub fn unwrap(&mut self, id: NodeId) -> DomResult<()> {
        let parent = self.parent(id).ok_or(DomError::Detached(id))?;
        let kids = self.children(id)?.to_vec();
        let idx = self.child_index(parent, id)?;
        {
            let p = self.node_mut(parent)?;
            p.children.remove(idx);
        }
        for (i, k) in kids.iter().enumerate() {
            self.node_mut(*k)?.parent = None;
            let p = self.node_mut(parent)?;
            p.children.insert(idx + i, *k);
            self.node_mut(*k)?.parent = Some(parent);
        }
        self.nodes.remove(&id);
        Ok(())
    }

    /// Merges adjacent text siblings throughout the subtree, restoring the
    /// canonical shape after wrap/unwrap cycles.
    pub fn normalize(&mut self, id: NodeId) {
        let kids = match self.children(id) {
            Ok(k) => k.to_vec(),
            Err(_) => return,
        };
        for k in &kids {
            if self.is_element(*k) {
                self.normalize(*k);
            }
        }
        let mut i = 0;
        loop {
            let kids = match self.children(id) {
                Ok(k) => k.to_vec(),
                Err(_) => return,
            };
            if kids.len() < 2 || i + 1 >= kids.len() {
                break;
            }
            let (a, b) = (kids[i], kids[i + 1]);
            if self.is_text(a) && self.is_text(b) {
                let extra = match self.nodes.get(&b).map(|n| &n.kind) {
                    Some(NodeKind::Text { content }) => content.clone(),
                    _ => break,
                };
                if let Ok(node) = self.node_mut(a) {
                    if let NodeKind::Text { content } = &mut node.kind {
                        content.push_str(&extra);
                    }
                }
                let _ = self.remove(b);
            } else {
                i += 1;
            }
        }
    }

    /// Finds the leftmost occurrence of `needle` whose scope-wide text
    /// offset is at least `from`. Occurrences must fall within one parent's
    /// contiguous run of text children; runs are scanned fresh on every
    /// call, so structural edits between calls are fine.
    pub fn find_text_match(&self, scope: NodeId, needle: &str, from: usize) -> Option<TextMatch> {
        if needle.is_empty() {
            return None;
        }
        let mut offset = 0usize;
        self.find_match_in(scope, needle, from, &mut offset)
    }

    fn find_match_in(
        &self,
        id: NodeId,
        needle: &str,
        from: usize,
        offset: &mut usize,
    ) -> Option<TextMatch> {
        let kids = self.nodes.get(&id)?.children.clone();
        let mut i = 0;
        while i < kids.len() {
            if self.is_text(kids[i]) {
                // Gather the contiguous text run starting here.
                let run_global = *offset;
                let mut parts: Vec<(NodeId, usize, usize)> = Vec::new();
                let mut text = String::new();
                while i < kids.len() && self.is_text(kids[i]) {
                    let content = match self.nodes.get(&kids[i]).map(|n| &n.kind) {
                        Some(NodeKind::Text { content }) => content.as_str(),
                        _ => "",
                    };
                    parts.push((kids[i], text.len(), content.len()));
                    text.push_str(content);
                    i += 1;
                }
                *offset += text.len();
                for (pos, _) in text.match_indices(needle) {
                    if run_global + pos < from {
                        continue;
                    }
                    let end = pos + needle.len();
                    let (start_node, start_local) = parts
                        .iter()
                        .rev()
                        .find(|&&(_, s, _)| s <= pos)
                        .map(|&(n, s, _)| (n, s))?;
                    let (end_node, end_local) = parts
                        .iter()
                        .rev()
                        .find(|&&(_, s, _)| s < end)
                        .map(|&(n, s, _)| (n, s))?;
                    return Some(TextMatch {
                        parent: id,
                        start_node,
                        start_byte: pos - start_local,
                        end_node,
                        end_byte: end - end_local,
                        end_offset: run_global + end,
                    });
                }
            } else {
                if let Some(m) = self.find_match_in(kids[i], needle, from, offset) {
                    return Some(m);
                }
                i += 1;
            }
        }
        None
    }

    /// Splits the boundary text nodes of a match so it covers whole nodes,
    /// then wraps those nodes. Returns the wrapper.
    pub fn wrap_text_match(&mut self, m: &TextMatch, tag: &str) -> DomResult<NodeId> {
        let mut start_node = m.start_node;
        let mut end_node = m.end_node;
        let mut end_byte = m.end_byte;
        if m.start_byte > 0 {
            let right = self.split_text(start_node, m.start_byte)?;
            if end_node == start_node {
                end_node = right;
                end_byte -= m.start_byte;
            }
            start_node = right;
        }
        let end_len = match &self.node(end_node)?.kind {
            NodeKind::Text { content } => content.len(),
            NodeKind::Element { .. } => return Err(DomError::NotText(end_node)),
        };
        if end_byte < end_len {
            self.split_text(end_node, end_byte)?;
        }
        let start_idx = self.child_index(m.parent, start_node)?;
        let end_idx = self.child_index(m.parent, end_node)?;
        self.wrap_children(m.parent, start_idx, end_idx + 1, tag)
    }
}
