use skein_dom::DomError;
use std::fmt;
use thiserror::Error;

/// The class of an author-facing fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// An operation was applied to incompatible operand types.
    OperationType,
    /// A macro was called with the wrong number or types of arguments.
    MacroCall,
    /// A missing member on a structured value, or an undeclared temp
    /// variable.
    PropertyAccess,
    /// A feature that isn't available.
    Unimplemented,
    /// A fault escaping from the evaluation substrate itself, including
    /// misuse of an assignment operation as a value.
    HostRuntime,
}

impl FaultKind {
    pub fn name(&self) -> &'static str {
        match self {
            FaultKind::OperationType => "operation",
            FaultKind::MacroCall => "macrocall",
            FaultKind::PropertyAccess => "property",
            FaultKind::Unimplemented => "unimplemented",
            FaultKind::HostRuntime => "runtime",
        }
    }

    /// Extra explanation shown alongside the message, to give the author
    /// sufficient assistance in understanding the fault.
    pub fn explanation(&self) -> &'static str {
        match self {
            FaultKind::OperationType => {
                "You tried to use an operation on some data, but the data's type was incorrect."
            }
            FaultKind::MacroCall => "You tried to use a macro, but it wasn't written correctly.",
            FaultKind::PropertyAccess => {
                "You tried to access a value, but I couldn't find it."
            }
            FaultKind::Unimplemented => "I don't have this particular feature. I'm sorry.",
            FaultKind::HostRuntime => {
                "This fault was reported by the runtime itself. It usually means an expression was badly written."
            }
        }
    }
}

/// An author-facing fault. Faults are ordinary values: they render inline
/// as error-marker nodes and never stop sibling content from rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
}

impl Fault {
    pub fn operation(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::OperationType,
            message: message.into(),
        }
    }

    pub fn macro_call(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::MacroCall,
            message: message.into(),
        }
    }

    pub fn property(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::PropertyAccess,
            message: message.into(),
        }
    }

    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Unimplemented,
            message: message.into(),
        }
    }

    pub fn host(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::HostRuntime,
            message: message.into(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.name(), self.message)
    }
}

/// Errors that abort the render pass. Unlike [`Fault`]s these indicate a
/// wiring defect in the embedding layer, not an authoring mistake.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A macro was exposed as a changer without a registered transform.
    #[error("no changer transform registered for '{0}'")]
    UnregisteredChanger(String),

    #[error(transparent)]
    Dom(#[from] DomError),
}
