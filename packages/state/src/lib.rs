pub mod history;
pub mod storage;

pub use history::{History, Moment, Variables};
pub use storage::{MemoryStorage, StateError, Storage};
