//! # Turn history
//!
//! Tracks the sequence of game moments and enables rewind/fast-forward
//! time travel.
//!
//! ## Design
//!
//! - `present` is the mutable moment the current turn is writing into
//! - `commit` snapshots the present onto the past and opens the next turn
//! - Rewind moves the present to the future stack and pops the past
//! - Any commit clears the future stack
//! - Listeners fire after every movement with a read-only snapshot

use skein_common::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, instrument};

pub type Variables = BTreeMap<String, Value>;

/// An immutable snapshot of the variable store and current passage.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Moment {
    pub passage: String,
    pub variables: Variables,
}

impl Moment {
    pub fn new(passage: impl Into<String>) -> Self {
        Self {
            passage: passage.into(),
            variables: Variables::new(),
        }
    }
}

type ChangeListener = Box<dyn Fn(&[Moment], usize)>;

/// The turn history: committed past, mutable present, undone future.
pub struct History {
    past: Vec<Moment>,
    present: Moment,
    future: Vec<Moment>,
    listeners: Vec<ChangeListener>,
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("past", &self.past)
            .field("present", &self.present)
            .field("future", &self.future)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self {
            past: Vec::new(),
            present: Moment::default(),
            future: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub(crate) fn from_parts(past: Vec<Moment>, present: Moment) -> Self {
        Self {
            past,
            present,
            future: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn present(&self) -> &Moment {
        &self.present
    }

    pub fn passage(&self) -> &str {
        &self.present.passage
    }

    /// Sets the present passage without committing, used when the very
    /// first passage is shown.
    pub fn set_passage(&mut self, passage: impl Into<String>) {
        self.present.passage = passage.into();
    }

    pub fn variables(&self) -> &Variables {
        &self.present.variables
    }

    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.present.variables.get(name)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.present.variables.insert(name.into(), value);
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    /// Pushes a snapshot of the present onto the past and opens a new
    /// present for `passage`, inheriting the variable store. Clears the
    /// future: committing invalidates anything previously undone.
    #[instrument(skip(self), fields(passage = %passage))]
    pub fn commit(&mut self, passage: &str) {
        self.past.push(self.present.clone());
        self.present.passage = passage.to_string();
        self.future.clear();
        debug!(turns = self.past.len(), "committed turn");
        self.notify();
    }

    /// Moves up to `steps` moments from the past into the present, pushing
    /// displaced presents onto the future. Returns whether any movement
    /// occurred.
    pub fn rewind(&mut self, steps: usize) -> bool {
        let mut moved = false;
        for _ in 0..steps {
            let Some(moment) = self.past.pop() else { break };
            let displaced = std::mem::replace(&mut self.present, moment);
            self.future.push(displaced);
            moved = true;
        }
        if moved {
            debug!(depth = self.future.len(), "rewound");
            self.notify();
        }
        moved
    }

    /// Rewinds by the distance since `passage` was last visited. A passage
    /// that was never visited is a no-op.
    pub fn rewind_to_passage(&mut self, passage: &str) -> bool {
        match self.last_visited_distance(passage) {
            Some(steps) => self.rewind(steps),
            None => false,
        }
    }

    /// The symmetric inverse of [`History::rewind`].
    pub fn fast_forward(&mut self, steps: usize) -> bool {
        let mut moved = false;
        for _ in 0..steps {
            let Some(moment) = self.future.pop() else { break };
            let displaced = std::mem::replace(&mut self.present, moment);
            self.past.push(displaced);
            moved = true;
        }
        if moved {
            debug!(depth = self.past.len(), "fast-forwarded");
            self.notify();
        }
        moved
    }

    /// How many times `passage` appears in the visited sequence (committed
    /// moments plus the present).
    pub fn visit_count(&self, passage: &str) -> usize {
        self.past
            .iter()
            .filter(|m| m.passage == passage)
            .count()
            + usize::from(self.present.passage == passage)
    }

    /// How many turns ago `passage` was last visited: 0 for the current
    /// passage, `None` if never visited.
    pub fn last_visited_distance(&self, passage: &str) -> Option<usize> {
        if self.present.passage == passage {
            return Some(0);
        }
        self.past
            .iter()
            .rev()
            .position(|m| m.passage == passage)
            .map(|i| i + 1)
    }

    /// Every visited passage name in chronological order, including the
    /// present.
    pub fn visited_passage_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.past.iter().map(|m| m.passage.clone()).collect();
        names.push(self.present.passage.clone());
        names
    }

    /// Read-only snapshot of the full turn history (past plus present, in
    /// chronological order) for debugging and introspection.
    pub fn moments(&self) -> Vec<Moment> {
        let mut all = self.past.clone();
        all.push(self.present.clone());
        all
    }

    pub(crate) fn past(&self) -> &[Moment] {
        &self.past
    }

    /// Registers a listener fired after every commit, rewind and
    /// fast-forward with the history snapshot and the present index.
    pub fn on_change(&mut self, listener: impl Fn(&[Moment], usize) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&self) {
        if self.listeners.is_empty() {
            return;
        }
        let snapshot = self.moments();
        let index = self.past.len();
        for listener in &self.listeners {
            listener(&snapshot, index);
        }
    }
}
