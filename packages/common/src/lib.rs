pub mod value;

pub use value::{ChangerCommand, ChangerStep, Value};
