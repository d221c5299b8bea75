use crate::tags;
use crate::target::Selection;
use skein_common::Value;
use skein_dom::{DomResult, NodeId, RenderTree};
use std::collections::BTreeMap;

/// Special styling applied to a selection of a passage's rendered regions.
///
/// Enchantments are registered with a [`crate::Section`], which re-runs
/// them whenever its tree is permuted: `disenchant` removes the wrapper
/// elements installed by the previous `enchant`, then `enchant` selects the
/// regions afresh and wraps them again. The enchantment owns exactly the
/// wrappers it inserted and never touches anything else.
#[derive(Debug, Clone)]
pub struct Enchantment {
    pub selection: Selection,
    pub attrs: Vec<(String, String)>,
    pub data: BTreeMap<String, Value>,
    wrappers: Vec<NodeId>,
}

impl Enchantment {
    pub fn new(selection: Selection) -> Self {
        Self {
            selection,
            attrs: Vec::new(),
            data: BTreeMap::new(),
            wrappers: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn with_data(mut self, name: impl Into<String>, value: Value) -> Self {
        self.data.insert(name.into(), value);
        self
    }

    /// Wraps each region the selection currently resolves to, applying the
    /// attrs and data to the fresh wrappers. Any wrappers from a previous
    /// call are removed first.
    pub fn enchant(&mut self, tree: &mut RenderTree, scope: NodeId) -> DomResult<()> {
        self.disenchant(tree)?;
        match self.selection.clone() {
            Selection::Hooks(hooks) => {
                for hook in hooks.resolve(tree, scope) {
                    let Some(parent) = tree.parent(hook) else {
                        continue;
                    };
                    let idx = tree
                        .children(parent)?
                        .iter()
                        .position(|&c| c == hook)
                        .unwrap_or(0);
                    let wrapper = tree.wrap_children(parent, idx, idx + 1, tags::ENCHANTMENT)?;
                    self.decorate(tree, wrapper)?;
                    self.wrappers.push(wrapper);
                }
            }
            Selection::Search(search) => {
                // Keep each match wrapped rather than letting for_each
                // unwrap it: the wrapper is detached from the iteration by
                // re-wrapping its contents in an owned enchantment element.
                let mut owned = Vec::new();
                search.for_each(tree, scope, |tree, wrapper| {
                    let len = tree.children(wrapper)?.len();
                    let inner = tree.wrap_children(wrapper, 0, len, tags::ENCHANTMENT)?;
                    owned.push(inner);
                    Ok(())
                })?;
                for wrapper in owned {
                    self.decorate(tree, wrapper)?;
                    self.wrappers.push(wrapper);
                }
            }
        }
        Ok(())
    }

    /// Removes exactly the wrappers installed by the previous `enchant`,
    /// splicing their contents back in place. A no-op when none exist.
    pub fn disenchant(&mut self, tree: &mut RenderTree) -> DomResult<()> {
        for wrapper in std::mem::take(&mut self.wrappers) {
            if tree.contains(wrapper) {
                tree.unwrap(wrapper)?;
            }
        }
        Ok(())
    }

    fn decorate(&self, tree: &mut RenderTree, wrapper: NodeId) -> DomResult<()> {
        for (name, value) in &self.attrs {
            tree.set_attr(wrapper, name, value)?;
        }
        for (name, value) in &self.data {
            tree.set_data(wrapper, name, value.clone())?;
        }
        Ok(())
    }
}
