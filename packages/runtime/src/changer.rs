use crate::ast::ContentNode;
use crate::target::{HookSet, PseudoHookSet};
use skein_common::Value;
use skein_dom::NodeId;
use std::collections::BTreeMap;

pub use skein_common::{ChangerCommand, ChangerStep};

/// Where a descriptor renders its source.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A concrete node of the current render tree.
    Node(NodeId),
    /// Every hook anchor matching a selector, resolved fresh at render time.
    Hooks(HookSet),
    /// Every literal occurrence of a search string, resolved fresh at
    /// render time.
    Search(PseudoHookSet),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionMode {
    Replace,
    Append,
    Prepend,
}

/// The mutable render request built for each hook or expression about to be
/// rendered. Changer chains mutate this record before rendering; mutating
/// it is the sole mechanism by which a changer affects output.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeDescriptor {
    /// The source to render, which can be finagled before it is run.
    pub source: Vec<ContentNode>,
    pub target: Target,
    pub mode: InsertionMode,
    /// Inline styles applied to the target element, in application order.
    pub styles: Vec<(String, String)>,
    /// Attributes applied to the target element, in application order.
    pub attrs: Vec<(String, String)>,
    /// Arbitrary auxiliary payload attached to the target element.
    pub data: BTreeMap<String, Value>,
    /// Scheduling hint for the host's transition machinery.
    pub transition: Option<String>,
    /// Disabled descriptors render nothing; conditional constructs work by
    /// clearing this flag.
    pub enabled: bool,
}

impl ChangeDescriptor {
    pub fn new(source: Vec<ContentNode>, target: Target) -> Self {
        Self {
            source,
            target,
            mode: InsertionMode::Replace,
            styles: Vec::new(),
            attrs: Vec::new(),
            data: BTreeMap::new(),
            transition: None,
            enabled: true,
        }
    }
}
