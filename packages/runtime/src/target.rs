use crate::tags;
use skein_dom::{DomResult, NodeId, RenderTree};

/// A selector classified by its sigil: a leading `?` names hooks, anything
/// else is a literal search string.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Hooks(HookSet),
    Search(PseudoHookSet),
}

impl Selection {
    pub fn classify(selector: &str) -> Selection {
        match selector.strip_prefix('?') {
            Some(name) => Selection::Hooks(HookSet::new(name)),
            None => Selection::Search(PseudoHookSet::new(selector)),
        }
    }
}

/// A selection of named hook anchors. Hooks can share a name, so one set
/// can cover several regions; resolution happens fresh on every call so the
/// set always reflects the current tree.
#[derive(Debug, Clone, PartialEq)]
pub struct HookSet {
    pub name: String,
}

impl HookSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// All hook anchors below `scope` carrying this set's name, in document
    /// order. An empty result is a silent no-op for callers.
    pub fn resolve(&self, tree: &RenderTree, scope: NodeId) -> Vec<NodeId> {
        tree.find_by_tag_attr(scope, tags::HOOK, "name", &self.name)
    }
}

/// A selection of literal text occurrences, hooking prose the author never
/// marked up. Each occurrence is wrapped in a transient element for the
/// duration of one callback, giving the matched run a solid parent to
/// manipulate through.
#[derive(Debug, Clone, PartialEq)]
pub struct PseudoHookSet {
    pub needle: String,
}

impl PseudoHookSet {
    pub fn new(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
        }
    }

    /// Iterates the non-overlapping leftmost occurrences of the needle
    /// below `scope`. Every occurrence is found and wrapped before any
    /// callback runs, so text that a destructive callback inserts is never
    /// itself matched. Each wrapper is then handed to `f` and unwrapped
    /// again unless `f` destroyed it.
    pub fn for_each<F>(&self, tree: &mut RenderTree, scope: NodeId, mut f: F) -> DomResult<()>
    where
        F: FnMut(&mut RenderTree, NodeId) -> DomResult<()>,
    {
        // Wrapping adds no text, so resuming from the previous match end
        // keeps the offsets valid across the whole collection phase.
        let mut wrappers = Vec::new();
        let mut from = 0usize;
        while let Some(m) = tree.find_text_match(scope, &self.needle, from) {
            from = m.end_offset;
            wrappers.push(tree.wrap_text_match(&m, tags::PSEUDO_HOOK)?);
        }
        for wrapper in wrappers {
            f(tree, wrapper)?;
            if tree.contains(wrapper) {
                tree.unwrap(wrapper)?;
            }
        }
        tree.normalize(scope);
        Ok(())
    }
}
