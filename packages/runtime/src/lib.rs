pub mod ast;
pub mod changer;
pub mod enchantment;
pub mod engine;
pub mod error;
pub mod registry;
pub mod scope;
pub mod section;
pub mod target;



#[cfg(test)]
mod tests_section;

#[cfg(test)]
mod tests_targeting;

pub use ast::{AssignOp, BinaryOp, ContentNode, ExprNode, UnaryOp, VariableKind, VariableRef};
pub use changer::{ChangeDescriptor, InsertionMode, Target};
pub use enchantment::Enchantment;
pub use engine::{Engine, EngineError, LiveHook, Passage, Story};
pub use error::{Fault, FaultKind, RenderError};
pub use registry::{ChangerFn, CheckFn, MacroContext, MacroEntry, MacroFn, Registry};
pub use section::{AssignmentRequest, Outcome, Section};
pub use target::{HookSet, PseudoHookSet, Selection};

pub use skein_common::{ChangerCommand, ChangerStep, Value};

/// Element tags used in the render tree.
pub mod tags {
    pub const PASSAGE: &str = "passage";
    pub const HOOK: &str = "hook";
    pub const PSEUDO_HOOK: &str = "pseudo-hook";
    pub const ENCHANTMENT: &str = "enchantment";
    pub const ERROR: &str = "error";
}
