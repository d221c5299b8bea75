//! Expression-tree hand-off types.
//!
//! The markup tokenizer and parser are external collaborators: they hand the
//! runtime an already-structured tree of [`ContentNode`]s per passage. The
//! runtime never parses source text.
//!
//! One contract the parser must honor when desugaring the surface link
//! syntax into macro calls: in `[[text->target]]` the *rightmost* `->` wins,
//! and in `[[target<-text]]` the *leftmost* `<-` wins, so the target is
//! always the outermost pointed-to side. This tie-break is behavior, not an
//! implementation detail, and the runtime assumes it rather than re-deriving
//! it.

use serde::{Deserialize, Serialize};
use skein_common::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableKind {
    /// `$name`: survives across turns, owned by the history.
    Global,
    /// `_name`: scoped to the active render frame.
    Temp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRef {
    pub kind: VariableKind,
    pub name: String,
}

impl VariableRef {
    pub fn global(name: impl Into<String>) -> Self {
        Self {
            kind: VariableKind::Global,
            name: name.into(),
        }
    }

    pub fn temp(name: impl Into<String>) -> Self {
        Self {
            kind: VariableKind::Temp,
            name: name.into(),
        }
    }

    /// The sigiled spelling, used in fault messages.
    pub fn sigiled(&self) -> String {
        match self.kind {
            VariableKind::Global => format!("${}", self.name),
            VariableKind::Temp => format!("_{}", self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "is",
            BinaryOp::Ne => "is not",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

/// The operator of an assignment: a direct set, or a composing operator
/// (`Augment(Add)` appends to strings and arrays).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Set,
    Augment(BinaryOp),
}

/// One expression node. Children are ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprNode {
    Literal(Value),
    Variable(VariableRef),
    Unary {
        op: UnaryOp,
        operand: Box<ExprNode>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<ExprNode>,
        rhs: Box<ExprNode>,
    },
    /// `$dest to value`. Evaluates to an assignment request; only the
    /// section may execute it, at statement position.
    Assign {
        op: AssignOp,
        dest: VariableRef,
        value: Box<ExprNode>,
    },
    MacroCall {
        name: String,
        args: Vec<ExprNode>,
    },
    /// `?name`: a hook reference.
    HookRef(String),
    Grouping(Box<ExprNode>),
}

/// One node of a passage's rendered content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentNode {
    Text(String),
    Expression(ExprNode),
    Hook {
        name: Option<String>,
        children: Vec<ContentNode>,
    },
}

impl ContentNode {
    pub fn text(s: impl Into<String>) -> Self {
        ContentNode::Text(s.into())
    }

    pub fn hook(name: impl Into<String>, children: Vec<ContentNode>) -> Self {
        ContentNode::Hook {
            name: Some(name.into()),
            children,
        }
    }

    pub fn anonymous_hook(children: Vec<ContentNode>) -> Self {
        ContentNode::Hook {
            name: None,
            children,
        }
    }
}
