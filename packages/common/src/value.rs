use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Runtime value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// A stored changer command. Changers are first-class values so that
    /// authors can keep them in variables and combine them later.
    Changer(ChangerCommand),
    /// A hook reference produced by the `?name` selector syntax.
    HookRef(String),
}

impl Value {
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Num(n) => n.to_string(),
            Value::Str(s) => s.clone(),
            Value::Array(a) => a
                .iter()
                .map(Value::to_display_string)
                .collect::<Vec<_>>()
                .join(","),
            Value::Map(m) => m
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v.to_display_string()))
                .collect::<Vec<_>>()
                .join(","),
            Value::Changer(c) => format!("[a ({}:) command]", c.head_name()),
            Value::HookRef(name) => format!("?{}", name),
        }
    }

    /// Author-facing description of this value's type, used in fault messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "nothing",
            Value::Bool(_) => "a boolean",
            Value::Num(_) => "a number",
            Value::Str(_) => "a string",
            Value::Array(_) => "an array",
            Value::Map(_) => "a datamap",
            Value::Changer(_) => "a changer command",
            Value::HookRef(_) => "a hook reference",
        }
    }
}

/// One step of a changer chain: the macro name that produced it, plus the
/// author-supplied parameters. For `(transition: "dissolve")` the name is
/// "transition" and the params are `["dissolve"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangerStep {
    pub name: String,
    pub params: Vec<Value>,
}

/// An immutable, composable sequence of changer steps.
///
/// Combining two changers concatenates their step sequences into a new
/// command without mutating either operand, so a chain can safely be
/// combined more than once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangerCommand {
    steps: Vec<ChangerStep>,
}

impl ChangerCommand {
    pub fn new(name: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            steps: vec![ChangerStep {
                name: name.into(),
                params,
            }],
        }
    }

    /// Appends `other`'s steps after this command's current tail, producing
    /// a new chain. Application order is chain order, left to right.
    pub fn combine(&self, other: &ChangerCommand) -> ChangerCommand {
        let mut steps = self.steps.clone();
        steps.extend(other.steps.iter().cloned());
        ChangerCommand { steps }
    }

    pub fn steps(&self) -> &[ChangerStep] {
        &self.steps
    }

    /// The macro name of the first step, used when naming the whole chain
    /// in messages.
    pub fn head_name(&self) -> &str {
        self.steps
            .first()
            .map(|s| s.name.as_str())
            .unwrap_or_default()
    }
}
