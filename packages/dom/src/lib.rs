pub mod backend;
pub mod node;
pub mod tree;

pub use backend::{replay, DocumentBackend, RecordingBackend};
pub use node::{NodeId, NodeKind, RenderNode};
pub use tree::{DomError, DomResult, RenderTree, TextMatch};
