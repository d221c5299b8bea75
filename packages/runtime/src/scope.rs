use skein_common::Value;
use std::collections::BTreeMap;

/// The stack of temp-variable frames for one render pass.
///
/// Each hook render pushes a frame; reads fall through to outer frames,
/// writes always land on the innermost frame, shadowing any outer binding
/// of the same name.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<BTreeMap<String, Value>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.frames.push(BTreeMap::new());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Innermost binding of `name`, if any frame holds one.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|f| f.get(name))
    }

    /// Binds `name` in the innermost frame. Returns false when no frame is
    /// active, which callers report as a fault.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.insert(name.to_string(), value);
                true
            }
            None => false,
        }
    }
}
