use crate::changer::{ChangeDescriptor, ChangerCommand, InsertionMode, Target};
use crate::error::{Fault, RenderError};
use crate::section::Outcome;
use crate::target::{HookSet, PseudoHookSet};
use skein_common::Value;
use skein_state::History;
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::error;

/// Context handed to macro evaluation functions: read access to the
/// history, plus the section's navigation-request list, which redirect
/// macros push onto. Requests are honored after the current pass, never
/// during it.
pub struct MacroContext<'a> {
    pub history: &'a History,
    pub navigations: &'a RefCell<Vec<String>>,
}

/// Evaluates a macro call to a value, a changer, or an assignment request.
pub type MacroFn = fn(&MacroContext, &[Value]) -> Result<Outcome, Fault>;

/// Mutates a descriptor: the implementation of one changer step.
pub type ChangerFn = fn(&mut ChangeDescriptor, &[Value]);

/// Validates changer-macro arguments at construction time.
pub type CheckFn = fn(&[Value]) -> Result<(), Fault>;

#[derive(Debug, Clone, Copy)]
pub enum MacroEntry {
    /// A plain macro evaluated to an outcome.
    Value(MacroFn),
    /// A changer macro: its call constructs a [`ChangerCommand`] carrying
    /// its name and parameters; the transform runs later, at apply time.
    Changer { check: Option<CheckFn> },
}

/// The operation registry: macro evaluation functions and changer
/// transform functions, keyed by name.
///
/// This is an explicit value passed into each [`crate::Section`]; the
/// embedding layer populates it before any evaluation occurs.
#[derive(Default)]
pub struct Registry {
    macros: HashMap<String, MacroEntry>,
    changers: HashMap<String, ChangerFn>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with the built-in macros and changers.
    pub fn with_builtins() -> Self {
        let mut r = Self::new();
        builtins::install(&mut r);
        r
    }

    pub fn register_macro(&mut self, name: &str, f: MacroFn) {
        self.macros.insert(name.to_string(), MacroEntry::Value(f));
    }

    /// Registers a changer: its transform function plus an optional
    /// argument check run when the changer macro is called.
    pub fn register_changer(&mut self, name: &str, transform: ChangerFn, check: Option<CheckFn>) {
        self.macros
            .insert(name.to_string(), MacroEntry::Changer { check });
        self.changers.insert(name.to_string(), transform);
    }

    pub fn entry(&self, name: &str) -> Option<MacroEntry> {
        self.macros.get(name).copied()
    }

    /// Constructs a changer command for a changer-macro call, running its
    /// argument check first.
    pub fn make_changer(&self, name: &str, args: Vec<Value>) -> Result<ChangerCommand, Fault> {
        if let Some(MacroEntry::Changer { check: Some(check) }) = self.entry(name) {
            check(&args).map_err(|f| Fault {
                kind: f.kind,
                message: format!("({}:) {}", name, f.message),
            })?;
        }
        Ok(ChangerCommand::new(name, args))
    }

    /// Applies a changer chain to a descriptor in chain order. An
    /// unregistered transform name is fatal to the render pass: it means a
    /// macro was exposed as a changer without its transform being wired up.
    pub fn apply_changer(
        &self,
        chain: &ChangerCommand,
        desc: &mut ChangeDescriptor,
    ) -> Result<(), RenderError> {
        for step in chain.steps() {
            let Some(transform) = self.changers.get(&step.name) else {
                error!(name = %step.name, "changer transform missing from registry");
                return Err(RenderError::UnregisteredChanger(step.name.clone()));
            };
            transform(desc, &step.params);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("macros", &self.macros.len())
            .field("changers", &self.changers.len())
            .finish()
    }
}

/// The built-in standard library subset the runtime ships with. The full
/// macro catalog lives in the embedding layer and registers itself the same
/// way.
mod builtins {
    use super::*;

    pub fn install(r: &mut Registry) {
        r.register_macro("a", macro_array);
        r.register_macro("visited", macro_visited);
        r.register_macro("history", macro_history);
        r.register_macro("go-to", macro_go_to);

        r.register_changer("if", changer_if, Some(check_one_bool));
        r.register_changer("font", changer_font, Some(check_one_string));
        r.register_changer("text-colour", changer_text_colour, Some(check_one_string));
        r.register_changer("link", changer_link, Some(check_one_string));
        r.register_changer("transition", changer_transition, Some(check_one_string));
        r.register_changer("hook", changer_hook, Some(check_one_string));
        r.register_changer("replace", changer_replace, Some(check_one_selector));
        r.register_changer("append", changer_append, Some(check_one_selector));
        r.register_changer("prepend", changer_prepend, Some(check_one_selector));
    }

    fn macro_array(_ctx: &MacroContext, args: &[Value]) -> Result<Outcome, Fault> {
        Ok(Outcome::Value(Value::Array(args.to_vec())))
    }

    fn macro_visited(ctx: &MacroContext, args: &[Value]) -> Result<Outcome, Fault> {
        match args {
            [Value::Str(name)] => Ok(Outcome::Value(Value::Num(
                ctx.history.visit_count(name) as f64
            ))),
            _ => Err(Fault::macro_call(
                "(visited:) expects one passage name string.",
            )),
        }
    }

    fn macro_history(ctx: &MacroContext, args: &[Value]) -> Result<Outcome, Fault> {
        if !args.is_empty() {
            return Err(Fault::macro_call("(history:) expects no arguments."));
        }
        Ok(Outcome::Value(Value::Array(
            ctx.history
                .visited_passage_names()
                .into_iter()
                .map(Value::Str)
                .collect(),
        )))
    }

    fn macro_go_to(ctx: &MacroContext, args: &[Value]) -> Result<Outcome, Fault> {
        match args {
            [Value::Str(name)] => {
                ctx.navigations.borrow_mut().push(name.clone());
                Ok(Outcome::Value(Value::Null))
            }
            _ => Err(Fault::macro_call(
                "(go-to:) expects one passage name string.",
            )),
        }
    }

    fn check_one_bool(args: &[Value]) -> Result<(), Fault> {
        match args {
            [Value::Bool(_)] => Ok(()),
            [other] => Err(Fault::macro_call(format!(
                "expects a boolean, not {}.",
                other.type_name()
            ))),
            _ => Err(Fault::macro_call("expects exactly one argument.")),
        }
    }

    fn check_one_string(args: &[Value]) -> Result<(), Fault> {
        match args {
            [Value::Str(_)] => Ok(()),
            [other] => Err(Fault::macro_call(format!(
                "expects a string, not {}.",
                other.type_name()
            ))),
            _ => Err(Fault::macro_call("expects exactly one argument.")),
        }
    }

    fn check_one_selector(args: &[Value]) -> Result<(), Fault> {
        match args {
            [Value::Str(_)] | [Value::HookRef(_)] => Ok(()),
            [other] => Err(Fault::macro_call(format!(
                "expects a hook reference or search string, not {}.",
                other.type_name()
            ))),
            _ => Err(Fault::macro_call("expects exactly one argument.")),
        }
    }

    fn changer_if(desc: &mut ChangeDescriptor, params: &[Value]) {
        if let [Value::Bool(b)] = params {
            desc.enabled = *b;
        }
    }

    fn changer_font(desc: &mut ChangeDescriptor, params: &[Value]) {
        if let [Value::Str(family)] = params {
            desc.styles.push(("font-family".into(), family.clone()));
        }
    }

    fn changer_text_colour(desc: &mut ChangeDescriptor, params: &[Value]) {
        if let [Value::Str(colour)] = params {
            desc.styles.push(("color".into(), colour.clone()));
        }
    }

    fn changer_link(desc: &mut ChangeDescriptor, params: &[Value]) {
        if let [Value::Str(passage)] = params {
            desc.attrs.push(("class".into(), "link".into()));
            desc.data
                .insert("link".into(), Value::Str(passage.clone()));
        }
    }

    fn changer_transition(desc: &mut ChangeDescriptor, params: &[Value]) {
        if let [Value::Str(name)] = params {
            desc.transition = Some(name.clone());
        }
    }

    fn changer_hook(desc: &mut ChangeDescriptor, params: &[Value]) {
        if let [Value::Str(name)] = params {
            desc.attrs.push(("name".into(), name.clone()));
        }
    }

    fn retarget(desc: &mut ChangeDescriptor, selector: &Value, mode: InsertionMode) {
        match selector {
            Value::HookRef(name) => {
                desc.target = Target::Hooks(HookSet::new(name.clone()));
                desc.mode = mode;
            }
            Value::Str(needle) => {
                desc.target = Target::Search(PseudoHookSet::new(needle.clone()));
                desc.mode = mode;
            }
            _ => {}
        }
    }

    fn changer_replace(desc: &mut ChangeDescriptor, params: &[Value]) {
        if let [selector] = params {
            retarget(desc, selector, InsertionMode::Replace);
        }
    }

    fn changer_append(desc: &mut ChangeDescriptor, params: &[Value]) {
        if let [selector] = params {
            retarget(desc, selector, InsertionMode::Append);
        }
    }

    fn changer_prepend(desc: &mut ChangeDescriptor, params: &[Value]) {
        if let [selector] = params {
            retarget(desc, selector, InsertionMode::Prepend);
        }
    }
}
