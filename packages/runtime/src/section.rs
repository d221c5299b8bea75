//! The render pipeline: a [`Section`] evaluates expression trees against
//! the variable stores and renders content into the owned tree, applying
//! changer chains to the hooks they precede.

use crate::ast::{AssignOp, BinaryOp, ContentNode, ExprNode, UnaryOp, VariableKind, VariableRef};
use crate::changer::{ChangeDescriptor, InsertionMode, Target};
use crate::enchantment::Enchantment;
use crate::error::{Fault, RenderError};
use crate::registry::{MacroContext, MacroEntry, Registry};
use crate::scope::ScopeStack;
use crate::tags;
use crate::target::Selection;
use skein_common::{ChangerCommand, Value};
use skein_dom::{NodeId, RenderTree};
use skein_state::History;
use std::cell::RefCell;
use tracing::{debug, instrument};

/// Hooks nested past this depth stop rendering with an inline fault. Guards
/// against a hook whose rendering re-renders itself.
const MAX_RENDER_DEPTH: usize = 50;

/// A pending variable mutation. Assignments evaluate to a request rather
/// than performing the write, so that only the section, at statement
/// position, may execute them. The destination store is untouched until
/// `Section::execute_assignment` runs the whole request.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentRequest {
    pub op: AssignOp,
    pub dest: VariableRef,
    pub value: Value,
}

/// What one expression evaluated to: a usable value, or an assignment
/// request that only statement position may consume.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Value(Value),
    Assignment(AssignmentRequest),
}

impl Outcome {
    /// The value, or a fault if this outcome is an assignment request being
    /// observed where a value was expected. The request's write never
    /// happens in that case.
    pub fn into_value(self) -> Result<Value, Fault> {
        match self {
            Outcome::Value(v) => Ok(v),
            Outcome::Assignment(req) => Err(Fault::host(format!(
                "The assignment to {} was used in a place where a value was expected.",
                req.dest.sigiled()
            ))),
        }
    }
}

/// One rendering context: borrows the registry, the history (for globals)
/// and the render tree, and owns the temp-variable scopes and the active
/// enchantments for the duration of the passage.
pub struct Section<'a> {
    registry: &'a Registry,
    history: &'a mut History,
    tree: &'a mut RenderTree,
    scopes: ScopeStack,
    enchantments: Vec<Enchantment>,
    nav_requests: RefCell<Vec<String>>,
    depth: usize,
}

impl<'a> Section<'a> {
    pub fn new(registry: &'a Registry, history: &'a mut History, tree: &'a mut RenderTree) -> Self {
        Self {
            registry,
            history,
            tree,
            scopes: ScopeStack::new(),
            enchantments: Vec::new(),
            nav_requests: RefCell::new(Vec::new()),
            depth: 0,
        }
    }

    /// Drains the navigations requested by redirect macros during this
    /// section's render passes, in request order.
    pub fn take_navigations(&mut self) -> Vec<String> {
        std::mem::take(self.nav_requests.get_mut())
    }

    pub fn tree(&self) -> &RenderTree {
        self.tree
    }

    /// Classifies a selector string into the targeting value it denotes.
    pub fn select(&self, selector: &str) -> Selection {
        Selection::classify(selector)
    }

    /// Registers an enchantment; it is applied (and re-applied after every
    /// render pass) until the section is dropped.
    pub fn add_enchantment(&mut self, enchantment: Enchantment) {
        self.enchantments.push(enchantment);
    }

    /// Re-runs every registered enchantment against the current tree. Each
    /// one removes its previous wrappers first, so the wrapping always
    /// reflects the tree as it stands now.
    pub fn update_enchantments(&mut self) -> Result<(), RenderError> {
        let root = self.tree.root();
        let mut enchantments = std::mem::take(&mut self.enchantments);
        for e in &mut enchantments {
            e.enchant(self.tree, root)?;
        }
        self.enchantments = enchantments;
        Ok(())
    }

    /// The main entry point: renders `source` into `target`, replacing its
    /// contents, then refreshes enchantments over the permuted tree.
    #[instrument(level = "debug", skip_all, fields(target = ?target))]
    pub fn render_into(
        &mut self,
        source: &[ContentNode],
        target: NodeId,
    ) -> Result<(), RenderError> {
        let desc = ChangeDescriptor::new(source.to_vec(), Target::Node(target));
        self.render_descriptor(desc)?;
        self.update_enchantments()
    }

    /// Renders one descriptor: resolves its target to concrete regions and
    /// applies the source, styles and attrs to each. A disabled descriptor
    /// renders nothing at all.
    pub fn render_descriptor(&mut self, desc: ChangeDescriptor) -> Result<(), RenderError> {
        if !desc.enabled {
            debug!("descriptor disabled, skipping");
            return Ok(());
        }
        match desc.target.clone() {
            Target::Node(id) => self.apply_to_node(id, &desc),
            Target::Hooks(hooks) => {
                // Resolved fresh, so hooks rendered earlier in this very
                // pass are included. An empty resolution is a no-op.
                for hook in hooks.resolve(self.tree, self.tree.root()) {
                    self.apply_to_node(hook, &desc)?;
                }
                Ok(())
            }
            Target::Search(search) => {
                let root = self.tree.root();
                let destructive =
                    desc.mode == InsertionMode::Replace && !desc.source.is_empty();
                // Find and wrap every occurrence before rendering into any
                // of them, so text the rendered source inserts is never
                // itself matched. Wrapping adds no text, which keeps the
                // resume offsets valid during collection.
                let mut wrappers = Vec::new();
                let mut from = 0usize;
                while let Some(m) = self.tree.find_text_match(root, &search.needle, from) {
                    from = m.end_offset;
                    wrappers.push(self.tree.wrap_text_match(&m, tags::PSEUDO_HOOK)?);
                }
                for wrapper in wrappers {
                    self.apply_to_node(wrapper, &desc)?;
                    // A replacement invalidated the matched run, so the
                    // wrapper stays as the new content's parent. Otherwise
                    // the boundary is transient and comes straight off.
                    if !destructive && self.tree.contains(wrapper) {
                        self.tree.unwrap(wrapper)?;
                    }
                }
                self.tree.normalize(root);
                Ok(())
            }
        }
    }

    fn apply_to_node(&mut self, id: NodeId, desc: &ChangeDescriptor) -> Result<(), RenderError> {
        for (name, value) in &desc.styles {
            self.tree.set_style(id, name, value)?;
        }
        for (name, value) in &desc.attrs {
            self.tree.set_attr(id, name, value)?;
        }
        for (name, value) in &desc.data {
            self.tree.set_data(id, name, value.clone())?;
        }
        if let Some(transition) = &desc.transition {
            self.tree
                .set_data(id, "transition", Value::Str(transition.clone()))?;
        }
        if desc.source.is_empty() {
            return Ok(());
        }
        // Replace and append render straight into the target, so content
        // rendered earlier in the same pass is already in the tree for any
        // search the rest of the source performs.
        match desc.mode {
            InsertionMode::Replace => {
                self.tree.clear_children(id)?;
                self.render_children_into(&desc.source, id)?;
            }
            InsertionMode::Append => {
                self.render_children_into(&desc.source, id)?;
            }
            InsertionMode::Prepend => {
                let scratch = self.tree.create_element("scratch");
                self.render_children_into(&desc.source, scratch)?;
                let rendered = self.tree.children(scratch)?.to_vec();
                for (i, node) in rendered.into_iter().enumerate() {
                    self.tree.insert_child(id, i, node)?;
                }
                self.tree.remove(scratch)?;
            }
        }
        Ok(())
    }

    /// Renders a content sequence into `parent`, inside a fresh temp scope
    /// frame. Changer values collect into a chain that attaches to the next
    /// hook; faults render inline and never stop the siblings.
    fn render_children_into(
        &mut self,
        nodes: &[ContentNode],
        parent: NodeId,
    ) -> Result<(), RenderError> {
        if self.depth >= MAX_RENDER_DEPTH {
            self.render_fault(
                parent,
                &Fault::host("Printing this content would cause an infinite regress."),
            )?;
            return Ok(());
        }
        self.depth += 1;
        self.scopes.push();
        let result = self.render_sequence(nodes, parent);
        self.scopes.pop();
        self.depth -= 1;
        result
    }

    fn render_sequence(&mut self, nodes: &[ContentNode], parent: NodeId) -> Result<(), RenderError> {
        let mut pending: Option<ChangerCommand> = None;
        for node in nodes {
            match node {
                ContentNode::Text(text) => {
                    let t = self.tree.create_text(text);
                    self.tree.append_child(parent, t)?;
                }
                ContentNode::Expression(expr) => match self.eval(expr) {
                    Err(fault) => self.render_fault(parent, &fault)?,
                    Ok(Outcome::Assignment(req)) => {
                        if let Err(fault) = self.execute_assignment(req) {
                            self.render_fault(parent, &fault)?;
                        }
                    }
                    Ok(Outcome::Value(Value::Changer(command))) => {
                        pending = Some(match pending.take() {
                            Some(chain) => chain.combine(&command),
                            None => command,
                        });
                    }
                    Ok(Outcome::Value(value)) => {
                        let text = value.to_display_string();
                        if !text.is_empty() {
                            let t = self.tree.create_text(&text);
                            self.tree.append_child(parent, t)?;
                        }
                    }
                },
                ContentNode::Hook { name, children } => {
                    self.render_hook(parent, name.as_deref(), children, pending.take())?;
                }
            }
        }
        if let Some(chain) = pending {
            // A changer with no hook to change is an authoring mistake.
            self.render_fault(
                parent,
                &Fault::macro_call(format!(
                    "The ({}:) changer should be followed by a hook.",
                    chain.head_name()
                )),
            )?;
        }
        Ok(())
    }

    fn render_hook(
        &mut self,
        parent: NodeId,
        name: Option<&str>,
        children: &[ContentNode],
        chain: Option<ChangerCommand>,
    ) -> Result<(), RenderError> {
        let anchor = self.tree.create_element(tags::HOOK);
        if let Some(name) = name {
            self.tree.set_attr(anchor, "name", name)?;
        }
        let mut desc = ChangeDescriptor::new(children.to_vec(), Target::Node(anchor));
        if let Some(chain) = chain {
            self.registry.apply_changer(&chain, &mut desc)?;
        }
        if desc.target == Target::Node(anchor) {
            // The anchor element stays in place even when disabled, so a
            // later (replace: ?name) can still find it.
            self.tree.append_child(parent, anchor)?;
            self.render_descriptor(desc)
        } else {
            // The chain redirected the source elsewhere; no anchor is left
            // at the hook's own position.
            self.tree.remove(anchor)?;
            self.render_descriptor(desc)
        }
    }

    fn render_fault(&mut self, parent: NodeId, fault: &Fault) -> Result<(), RenderError> {
        debug!(kind = fault.kind.name(), message = %fault.message, "rendering fault");
        let marker = self.tree.create_element(tags::ERROR);
        self.tree.set_attr(marker, "class", fault.kind.name())?;
        self.tree.set_attr(marker, "title", fault.kind.explanation())?;
        let text = self.tree.create_text(&fault.message);
        self.tree.append_child(marker, text)?;
        self.tree.append_child(parent, marker)?;
        Ok(())
    }

    /// Evaluates one expression to an outcome. Author mistakes come back as
    /// `Err(Fault)` for the caller to render inline.
    pub fn eval(&mut self, expr: &ExprNode) -> Result<Outcome, Fault> {
        match expr {
            ExprNode::Literal(v) => Ok(Outcome::Value(v.clone())),
            ExprNode::Variable(var) => self.read_variable(var).map(Outcome::Value),
            ExprNode::Unary { op, operand } => {
                let v = self.eval(operand)?.into_value()?;
                apply_unary(*op, v).map(Outcome::Value)
            }
            ExprNode::Binary { op, lhs, rhs } => {
                let l = self.eval(lhs)?.into_value()?;
                let r = self.eval(rhs)?.into_value()?;
                apply_binary(*op, l, r).map(Outcome::Value)
            }
            ExprNode::Assign { op, dest, value } => {
                let v = self.eval(value)?.into_value()?;
                Ok(Outcome::Assignment(AssignmentRequest {
                    op: *op,
                    dest: dest.clone(),
                    value: v,
                }))
            }
            ExprNode::MacroCall { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?.into_value()?);
                }
                self.call_macro(name, values)
            }
            ExprNode::HookRef(name) => Ok(Outcome::Value(Value::HookRef(name.clone()))),
            ExprNode::Grouping(inner) => self.eval(inner),
        }
    }

    fn call_macro(&mut self, name: &str, args: Vec<Value>) -> Result<Outcome, Fault> {
        match self.registry.entry(name) {
            None => Err(Fault::macro_call(format!(
                "I don't have a macro named ({}:).",
                name
            ))),
            Some(MacroEntry::Value(f)) => {
                let ctx = MacroContext {
                    history: self.history,
                    navigations: &self.nav_requests,
                };
                f(&ctx, &args)
            }
            Some(MacroEntry::Changer { .. }) => {
                let command = self.registry.make_changer(name, args)?;
                Ok(Outcome::Value(Value::Changer(command)))
            }
        }
    }

    fn read_variable(&self, var: &VariableRef) -> Result<Value, Fault> {
        match var.kind {
            // Unset globals read as null rather than faulting, so stories
            // can test variables before their first set.
            VariableKind::Global => Ok(self
                .history
                .get_variable(&var.name)
                .cloned()
                .unwrap_or(Value::Null)),
            VariableKind::Temp => self.scopes.get(&var.name).cloned().ok_or_else(|| {
                Fault::property(format!(
                    "There isn't a temp variable named {} in this place.",
                    var.sigiled()
                ))
            }),
        }
    }

    /// Executes an assignment request against the destination store. The
    /// new value is fully computed before any write, so a fault midway
    /// leaves the store untouched.
    pub fn execute_assignment(&mut self, req: AssignmentRequest) -> Result<(), Fault> {
        let value = match req.op {
            AssignOp::Set => req.value,
            AssignOp::Augment(op) => {
                let current = self.read_variable(&req.dest)?;
                apply_binary(op, current, req.value)?
            }
        };
        match req.dest.kind {
            VariableKind::Global => {
                self.history.set_variable(&req.dest.name, value);
                Ok(())
            }
            VariableKind::Temp => {
                if self.scopes.assign(&req.dest.name, value) {
                    Ok(())
                } else {
                    Err(Fault::property(format!(
                        "There is no place for the temp variable {} to live.",
                        req.dest.sigiled()
                    )))
                }
            }
        }
    }
}

fn apply_unary(op: UnaryOp, v: Value) -> Result<Value, Fault> {
    match (op, v) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, Value::Num(n)) => Ok(Value::Num(-n)),
        (UnaryOp::Not, v) => Err(Fault::operation(format!(
            "I can only invert a boolean, not {}.",
            v.type_name()
        ))),
        (UnaryOp::Neg, v) => Err(Fault::operation(format!(
            "I can only negate a number, not {}.",
            v.type_name()
        ))),
    }
}

/// Typed operator table. No coercion: a type mismatch is an author-facing
/// fault naming both operand types.
fn apply_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, Fault> {
    match (op, lhs, rhs) {
        (BinaryOp::Add, Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
        (BinaryOp::Add, Value::Array(mut a), Value::Array(b)) => {
            a.extend(b);
            Ok(Value::Array(a))
        }
        (BinaryOp::Sub, Value::Num(a), Value::Num(b)) => Ok(Value::Num(a - b)),
        (BinaryOp::Mul, Value::Num(a), Value::Num(b)) => Ok(Value::Num(a * b)),
        (BinaryOp::Div, Value::Num(_), Value::Num(b)) if b == 0.0 => {
            Err(Fault::operation("I can't divide a number by zero."))
        }
        (BinaryOp::Div, Value::Num(a), Value::Num(b)) => Ok(Value::Num(a / b)),
        (BinaryOp::Eq, a, b) => Ok(Value::Bool(a == b)),
        (BinaryOp::Ne, a, b) => Ok(Value::Bool(a != b)),
        (BinaryOp::Lt, Value::Num(a), Value::Num(b)) => Ok(Value::Bool(a < b)),
        (BinaryOp::Le, Value::Num(a), Value::Num(b)) => Ok(Value::Bool(a <= b)),
        (BinaryOp::Gt, Value::Num(a), Value::Num(b)) => Ok(Value::Bool(a > b)),
        (BinaryOp::Ge, Value::Num(a), Value::Num(b)) => Ok(Value::Bool(a >= b)),
        (BinaryOp::Lt, Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a < b)),
        (BinaryOp::Le, Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a <= b)),
        (BinaryOp::Gt, Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a > b)),
        (BinaryOp::Ge, Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a >= b)),
        (BinaryOp::And, Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a && b)),
        (BinaryOp::Or, Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a || b)),
        (op, lhs, rhs) => Err(Fault::operation(format!(
            "I can't use '{}' with {} and {}.",
            op.symbol(),
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}
