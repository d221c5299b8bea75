use crate::ast::{AssignOp, BinaryOp, ContentNode, ExprNode, VariableRef};
use crate::registry::Registry;
use crate::section::Section;
use crate::tags;
use skein_common::Value;
use skein_dom::RenderTree;
use skein_state::History;

fn num(n: f64) -> ExprNode {
    ExprNode::Literal(Value::Num(n))
}

fn string(s: &str) -> ExprNode {
    ExprNode::Literal(Value::Str(s.into()))
}

fn global(name: &str) -> ExprNode {
    ExprNode::Variable(VariableRef::global(name))
}

fn set_global(name: &str, value: ExprNode) -> ContentNode {
    ContentNode::Expression(ExprNode::Assign {
        op: AssignOp::Set,
        dest: VariableRef::global(name),
        value: Box::new(value),
    })
}

fn render(source: Vec<ContentNode>) -> (RenderTree, History) {
    let registry = Registry::with_builtins();
    let mut history = History::new();
    let mut tree = RenderTree::new(tags::PASSAGE);
    let root = tree.root();
    let mut section = Section::new(&registry, &mut history, &mut tree);
    section.render_into(&source, root).unwrap();
    (tree, history)
}

fn error_count(tree: &RenderTree) -> usize {
    let mut ids = vec![tree.root()];
    ids.extend(tree.descendants(tree.root()));
    ids.iter()
        .filter(|&&id| {
            tree.node(id)
                .ok()
                .map(|n| n.tag() == Some(tags::ERROR))
                .unwrap_or(false)
        })
        .count()
}

#[test]
fn text_and_expressions_render_in_order() {
    let (tree, _) = render(vec![
        ContentNode::text("one plus one is "),
        ContentNode::Expression(ExprNode::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(num(1.0)),
            rhs: Box::new(num(1.0)),
        }),
    ]);
    assert_eq!(tree.text_content(tree.root()), "one plus one is 2");
}

#[test]
fn unset_global_reads_as_null_and_renders_nothing() {
    let (tree, _) = render(vec![ContentNode::Expression(global("unset"))]);
    assert_eq!(tree.text_content(tree.root()), "");
    assert_eq!(error_count(&tree), 0);
}

#[test]
fn undeclared_temp_variable_faults() {
    let (tree, _) = render(vec![ContentNode::Expression(ExprNode::Variable(
        VariableRef::temp("ghost"),
    ))]);
    assert_eq!(error_count(&tree), 1);
    assert!(tree.text_content(tree.root()).contains("_ghost"));
}

#[test]
fn assignment_at_statement_position_writes_the_store() {
    let (tree, history) = render(vec![
        set_global("gold", num(10.0)),
        ContentNode::text("you have "),
        ContentNode::Expression(global("gold")),
    ]);
    assert_eq!(tree.text_content(tree.root()), "you have 10");
    assert_eq!(history.get_variable("gold"), Some(&Value::Num(10.0)));
}

#[test]
fn augmented_assignment_composes_with_the_current_value() {
    let (_, history) = render(vec![
        set_global("name", string("Hare")),
        ContentNode::Expression(ExprNode::Assign {
            op: AssignOp::Augment(BinaryOp::Add),
            dest: VariableRef::global("name"),
            value: Box::new(string("court")),
        }),
    ]);
    assert_eq!(
        history.get_variable("name"),
        Some(&Value::Str("Harecourt".into()))
    );
}

#[test]
fn assignment_observed_as_a_value_faults_without_writing() {
    // (a: $gold to 10) observes the request as a macro argument.
    let (tree, history) = render(vec![ContentNode::Expression(ExprNode::MacroCall {
        name: "a".into(),
        args: vec![ExprNode::Assign {
            op: AssignOp::Set,
            dest: VariableRef::global("gold"),
            value: Box::new(num(10.0)),
        }],
    })]);
    assert_eq!(error_count(&tree), 1);
    assert_eq!(history.get_variable("gold"), None);
}

#[test]
fn type_mismatch_faults_inline_without_stopping_siblings() {
    let (tree, _) = render(vec![
        ContentNode::Expression(ExprNode::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(num(1.0)),
            rhs: Box::new(string("a")),
        }),
        ContentNode::text("still here"),
    ]);
    assert_eq!(error_count(&tree), 1);
    assert!(tree.text_content(tree.root()).contains("still here"));
}

#[test]
fn division_by_zero_faults() {
    let (tree, _) = render(vec![ContentNode::Expression(ExprNode::Binary {
        op: BinaryOp::Div,
        lhs: Box::new(num(1.0)),
        rhs: Box::new(num(0.0)),
    })]);
    assert_eq!(error_count(&tree), 1);
}

#[test]
fn unknown_macro_faults_inline() {
    let (tree, _) = render(vec![ContentNode::Expression(ExprNode::MacroCall {
        name: "mystery".into(),
        args: vec![],
    })]);
    assert_eq!(error_count(&tree), 1);
    assert!(tree.text_content(tree.root()).contains("(mystery:)"));
}

#[test]
fn changer_attaches_to_the_following_hook() {
    let (tree, _) = render(vec![
        ContentNode::Expression(ExprNode::MacroCall {
            name: "text-colour".into(),
            args: vec![string("red")],
        }),
        ContentNode::anonymous_hook(vec![ContentNode::text("hi")]),
    ]);
    let root = tree.root();
    let hooks = tree
        .descendants(root)
        .into_iter()
        .filter(|&id| tree.node(id).ok().and_then(|n| n.tag()) == Some(tags::HOOK))
        .collect::<Vec<_>>();
    assert_eq!(hooks.len(), 1);
    assert_eq!(tree.node(hooks[0]).unwrap().style("color"), Some("red"));
    assert_eq!(tree.text_content(hooks[0]), "hi");
}

#[test]
fn combined_changers_both_apply() {
    let (tree, _) = render(vec![
        ContentNode::Expression(ExprNode::MacroCall {
            name: "font".into(),
            args: vec![string("Skia")],
        }),
        ContentNode::Expression(ExprNode::MacroCall {
            name: "text-colour".into(),
            args: vec![string("red")],
        }),
        ContentNode::anonymous_hook(vec![ContentNode::text("hi")]),
    ]);
    let hook = tree
        .descendants(tree.root())
        .into_iter()
        .find(|&id| tree.node(id).ok().and_then(|n| n.tag()) == Some(tags::HOOK))
        .unwrap();
    let node = tree.node(hook).unwrap();
    assert_eq!(node.style("font-family"), Some("Skia"));
    assert_eq!(node.style("color"), Some("red"));
}

#[test]
fn dangling_changer_faults() {
    let (tree, _) = render(vec![ContentNode::Expression(ExprNode::MacroCall {
        name: "font".into(),
        args: vec![string("Skia")],
    })]);
    assert_eq!(error_count(&tree), 1);
    assert!(tree.text_content(tree.root()).contains("(font:)"));
}

#[test]
fn disabled_hook_keeps_its_anchor_but_renders_no_body() {
    let (tree, _) = render(vec![
        ContentNode::Expression(ExprNode::MacroCall {
            name: "if".into(),
            args: vec![ExprNode::Literal(Value::Bool(false))],
        }),
        ContentNode::hook("secret", vec![ContentNode::text("hidden")]),
    ]);
    let anchors = tree.find_by_tag_attr(tree.root(), tags::HOOK, "name", "secret");
    assert_eq!(anchors.len(), 1);
    assert_eq!(tree.text_content(tree.root()), "");
}

#[test]
fn temp_variables_are_scoped_to_their_hook() {
    // _inner set inside a hook is gone at the outer level.
    let (tree, _) = render(vec![
        ContentNode::anonymous_hook(vec![
            ContentNode::Expression(ExprNode::Assign {
                op: AssignOp::Set,
                dest: VariableRef::temp("inner"),
                value: Box::new(num(5.0)),
            }),
            ContentNode::Expression(ExprNode::Variable(VariableRef::temp("inner"))),
        ]),
        ContentNode::Expression(ExprNode::Variable(VariableRef::temp("inner"))),
    ]);
    assert!(tree.text_content(tree.root()).contains('5'));
    assert_eq!(error_count(&tree), 1);
}

#[test]
fn deep_hook_nesting_stops_with_a_fault() {
    let mut source = vec![ContentNode::text("bottom")];
    for _ in 0..60 {
        source = vec![ContentNode::anonymous_hook(source)];
    }
    let (tree, _) = render(source);
    assert_eq!(error_count(&tree), 1);
    assert!(!tree.text_content(tree.root()).contains("bottom"));
}
