//! The engine drives navigation: it owns the story, the history, the
//! current render tree and the registry, and performs one commit plus one
//! render pass per passage change.

use crate::ast::ContentNode;
use crate::changer::{ChangeDescriptor, Target};
use crate::error::RenderError;
use crate::registry::Registry;
use crate::section::Section;
use crate::tags;
use crate::target::Selection;
use skein_common::Value;
use skein_dom::{NodeId, RenderTree};
use skein_state::History;
use std::collections::{HashMap, VecDeque};
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("there is no passage named '{0}' in this story")]
    UnknownPassage(String),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// One passage: a name and its already-parsed content.
#[derive(Debug, Clone)]
pub struct Passage {
    pub name: String,
    pub source: Vec<ContentNode>,
}

impl Passage {
    pub fn new(name: impl Into<String>, source: Vec<ContentNode>) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// The story map, keyed by passage name.
#[derive(Debug, Clone, Default)]
pub struct Story {
    passages: HashMap<String, Passage>,
}

impl Story {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, passage: Passage) {
        self.passages.insert(passage.name.clone(), passage);
    }

    pub fn passage(&self, name: &str) -> Option<&Passage> {
        self.passages.get(name)
    }
}

/// A deferred re-render: `source` renders into whatever `selector` resolves
/// to, each time the engine ticks. Live hooks are torn down on navigation
/// so none of them ever fires against a stale tree.
#[derive(Debug, Clone)]
pub struct LiveHook {
    pub selector: String,
    pub source: Vec<ContentNode>,
}

pub struct Engine {
    registry: Registry,
    story: Story,
    history: History,
    tree: RenderTree,
    live_hooks: Vec<LiveHook>,
    pending: VecDeque<String>,
}

impl Engine {
    pub fn new(story: Story) -> Self {
        Self::with_registry(story, Registry::with_builtins())
    }

    pub fn with_registry(story: Story, registry: Registry) -> Self {
        Self {
            registry,
            story,
            history: History::new(),
            tree: RenderTree::new(tags::PASSAGE),
            live_hooks: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn tree(&self) -> &RenderTree {
        &self.tree
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Renders the starting passage. The first passage opens the first
    /// turn, so nothing is committed to the past yet; a redirect in its
    /// content then navigates (and commits) from there.
    pub fn start(&mut self, name: &str) -> Result<(), EngineError> {
        if self.story.passage(name).is_none() {
            return Err(EngineError::UnknownPassage(name.to_string()));
        }
        self.history.set_passage(name);
        self.render_present()?;
        self.drain()
    }

    /// Navigates to a passage: exactly one commit and one render pass per
    /// queued destination. A navigation requested while a pass is underway
    /// (a redirect macro like `(go-to:)`) lands on the same queue and runs
    /// after the current pass completes, never interleaved with it.
    pub fn go_to(&mut self, name: &str) -> Result<(), EngineError> {
        self.pending.push_back(name.to_string());
        self.drain()
    }

    /// Follows a link element placed by the `(link:)` changer. Returns
    /// false when the node carries no link payload.
    pub fn follow_link(&mut self, node: NodeId) -> Result<bool, EngineError> {
        let dest = self
            .tree
            .node(node)
            .ok()
            .and_then(|n| match n.data.get("link") {
                Some(Value::Str(dest)) => Some(dest.clone()),
                _ => None,
            });
        match dest {
            Some(dest) => {
                self.go_to(&dest)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Moves one turn into the past and re-renders, without committing.
    pub fn rewind(&mut self) -> Result<bool, EngineError> {
        if !self.history.rewind(1) {
            warn!("cannot rewind, no past turns");
            return Ok(false);
        }
        self.render_present()?;
        self.drain()?;
        Ok(true)
    }

    /// Moves one turn into the future and re-renders, without committing.
    pub fn fast_forward(&mut self) -> Result<bool, EngineError> {
        if !self.history.fast_forward(1) {
            warn!("cannot fast-forward, no future turns");
            return Ok(false);
        }
        self.render_present()?;
        self.drain()?;
        Ok(true)
    }

    /// Registers a live hook for the current passage. It runs on every
    /// `tick` until the next navigation tears it down.
    pub fn add_live_hook(&mut self, hook: LiveHook) {
        self.live_hooks.push(hook);
    }

    /// Runs every registered live hook once against the current tree.
    pub fn tick(&mut self) -> Result<(), EngineError> {
        for hook in self.live_hooks.clone() {
            let target = match Selection::classify(&hook.selector) {
                Selection::Hooks(h) => Target::Hooks(h),
                Selection::Search(s) => Target::Search(s),
            };
            let desc = ChangeDescriptor::new(hook.source, target);
            let mut section = Section::new(&self.registry, &mut self.history, &mut self.tree);
            section.render_descriptor(desc)?;
            let requests = section.take_navigations();
            self.pending.extend(requests);
        }
        self.drain()
    }

    fn drain(&mut self) -> Result<(), EngineError> {
        while let Some(name) = self.pending.pop_front() {
            self.navigate(&name)?;
        }
        Ok(())
    }

    #[instrument(level = "info", skip(self))]
    fn navigate(&mut self, name: &str) -> Result<(), EngineError> {
        if self.story.passage(name).is_none() {
            return Err(EngineError::UnknownPassage(name.to_string()));
        }
        self.history.commit(name);
        self.render_present()
    }

    /// Tears down the previous passage's tree and live hooks, then renders
    /// the present passage from scratch.
    fn render_present(&mut self) -> Result<(), EngineError> {
        let name = self.history.passage().to_string();
        let source = self
            .story
            .passage(&name)
            .ok_or_else(|| EngineError::UnknownPassage(name.clone()))?
            .source
            .clone();
        self.live_hooks.clear();
        self.tree = RenderTree::new(tags::PASSAGE);
        let root = self.tree.root();
        let mut section = Section::new(&self.registry, &mut self.history, &mut self.tree);
        section.render_into(&source, root)?;
        let requests = section.take_navigations();
        if !requests.is_empty() {
            info!(queued = requests.len(), "navigation requested during render");
        }
        self.pending.extend(requests);
        Ok(())
    }
}
