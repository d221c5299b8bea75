use crate::ast::ContentNode;
use crate::changer::{ChangeDescriptor, InsertionMode, Target};
use crate::enchantment::Enchantment;
use crate::registry::Registry;
use crate::section::Section;
use crate::tags;
use crate::target::{HookSet, PseudoHookSet, Selection};
use skein_common::Value;
use skein_dom::RenderTree;
use skein_state::History;

fn passage_with(source: Vec<ContentNode>) -> (Registry, History, RenderTree) {
    let registry = Registry::with_builtins();
    let mut history = History::new();
    let mut tree = RenderTree::new(tags::PASSAGE);
    let root = tree.root();
    let mut section = Section::new(&registry, &mut history, &mut tree);
    section.render_into(&source, root).unwrap();
    (registry, history, tree)
}

#[test]
fn selector_sigil_classifies_the_selection() {
    assert_eq!(
        Selection::classify("?top"),
        Selection::Hooks(HookSet::new("top"))
    );
    assert_eq!(
        Selection::classify("cats"),
        Selection::Search(PseudoHookSet::new("cats"))
    );
}

#[test]
fn hookset_resolves_every_matching_anchor_fresh() {
    let (_, _, tree) = passage_with(vec![
        ContentNode::hook("top", vec![ContentNode::text("a")]),
        ContentNode::hook("side", vec![ContentNode::text("b")]),
        ContentNode::hook("top", vec![ContentNode::text("c")]),
    ]);
    let set = HookSet::new("top");
    assert_eq!(set.resolve(&tree, tree.root()).len(), 2);
    assert!(HookSet::new("missing")
        .resolve(&tree, tree.root())
        .is_empty());
}

#[test]
fn replace_into_named_hooks_rewrites_each_one() {
    let (registry, mut history, mut tree) = passage_with(vec![
        ContentNode::hook("top", vec![ContentNode::text("old")]),
        ContentNode::text(" middle "),
        ContentNode::hook("top", vec![ContentNode::text("old")]),
    ]);
    let mut section = Section::new(&registry, &mut history, &mut tree);
    let desc = ChangeDescriptor::new(
        vec![ContentNode::text("new")],
        Target::Hooks(HookSet::new("top")),
    );
    section.render_descriptor(desc).unwrap();
    assert_eq!(tree.text_content(tree.root()), "new middle new");
}

#[test]
fn empty_hook_resolution_is_a_silent_no_op() {
    let (registry, mut history, mut tree) =
        passage_with(vec![ContentNode::text("unchanged")]);
    let mut section = Section::new(&registry, &mut history, &mut tree);
    let desc = ChangeDescriptor::new(
        vec![ContentNode::text("new")],
        Target::Hooks(HookSet::new("missing")),
    );
    section.render_descriptor(desc).unwrap();
    assert_eq!(tree.text_content(tree.root()), "unchanged");
}

#[test]
fn append_and_prepend_keep_existing_content() {
    let (registry, mut history, mut tree) =
        passage_with(vec![ContentNode::hook("top", vec![ContentNode::text("mid")])]);
    let mut section = Section::new(&registry, &mut history, &mut tree);
    let mut desc = ChangeDescriptor::new(
        vec![ContentNode::text("end")],
        Target::Hooks(HookSet::new("top")),
    );
    desc.mode = InsertionMode::Append;
    section.render_descriptor(desc).unwrap();

    let mut desc = ChangeDescriptor::new(
        vec![ContentNode::text("start ")],
        Target::Hooks(HookSet::new("top")),
    );
    desc.mode = InsertionMode::Prepend;
    section.render_descriptor(desc).unwrap();
    assert_eq!(tree.text_content(tree.root()), "start midend");
}

#[test]
fn pseudo_hook_replaces_every_occurrence() {
    let (registry, mut history, mut tree) =
        passage_with(vec![ContentNode::text("cats and cats")]);
    let mut section = Section::new(&registry, &mut history, &mut tree);
    let desc = ChangeDescriptor::new(
        vec![ContentNode::text("dogs")],
        Target::Search(PseudoHookSet::new("cats")),
    );
    section.render_descriptor(desc).unwrap();
    assert_eq!(tree.text_content(tree.root()), "dogs and dogs");
}

#[test]
fn replacement_containing_the_needle_is_not_rematched() {
    let (registry, mut history, mut tree) =
        passage_with(vec![ContentNode::text("cats and cats")]);
    let mut section = Section::new(&registry, &mut history, &mut tree);
    let desc = ChangeDescriptor::new(
        vec![ContentNode::text("nice cats")],
        Target::Search(PseudoHookSet::new("cats")),
    );
    section.render_descriptor(desc).unwrap();
    assert_eq!(tree.text_content(tree.root()), "nice cats and nice cats");
}

#[test]
fn for_each_never_matches_text_its_callback_inserted() {
    let (_, _, mut tree) = passage_with(vec![ContentNode::text("cats")]);
    let root = tree.root();
    let set = PseudoHookSet::new("cats");
    let mut seen = 0;
    set.for_each(&mut tree, root, |tree, wrapper| {
        seen += 1;
        tree.clear_children(wrapper)?;
        let t = tree.create_text("nice cats");
        tree.append_child(wrapper, t)
    })
    .unwrap();
    assert_eq!(seen, 1);
    assert_eq!(tree.text_content(root), "nice cats");
}

#[test]
fn pseudo_hook_decoration_without_source_leaves_text_intact() {
    let (registry, mut history, mut tree) =
        passage_with(vec![ContentNode::text("cats and cats")]);
    let before = tree.text_content(tree.root());
    let mut section = Section::new(&registry, &mut history, &mut tree);
    let mut desc = ChangeDescriptor::new(Vec::new(), Target::Search(PseudoHookSet::new("cats")));
    desc.styles.push(("color".into(), "red".into()));
    section.render_descriptor(desc).unwrap();
    assert_eq!(tree.text_content(tree.root()), before);
}

#[test]
fn non_destructive_for_each_is_idempotent() {
    let (_, _, mut tree) = passage_with(vec![ContentNode::text("cats and cats")]);
    let root = tree.root();
    let set = PseudoHookSet::new("cats");
    let mut seen = 0;
    set.for_each(&mut tree, root, |tree, wrapper| {
        seen += 1;
        assert_eq!(tree.text_content(wrapper), "cats");
        Ok(())
    })
    .unwrap();
    assert_eq!(seen, 2);
    assert_eq!(tree.text_content(root), "cats and cats");
}

#[test]
fn enchant_wraps_and_disenchant_restores() {
    let (_, _, mut tree) = passage_with(vec![ContentNode::text("cats and cats")]);
    let root = tree.root();
    let mut enchantment = Enchantment::new(Selection::classify("cats"))
        .with_attr("class", "glow")
        .with_data("strength", Value::Num(2.0));
    enchantment.enchant(&mut tree, root).unwrap();

    let wrapped = tree.find_by_tag_attr(root, tags::ENCHANTMENT, "class", "glow");
    assert_eq!(wrapped.len(), 2);
    for w in &wrapped {
        assert_eq!(tree.text_content(*w), "cats");
        assert_eq!(
            tree.node(*w).unwrap().data.get("strength"),
            Some(&Value::Num(2.0))
        );
    }

    enchantment.disenchant(&mut tree).unwrap();
    tree.normalize(root);
    assert_eq!(tree.text_content(root), "cats and cats");
    assert!(tree
        .find_by_tag_attr(root, tags::ENCHANTMENT, "class", "glow")
        .is_empty());
}

#[test]
fn re_enchanting_tracks_the_permuted_tree() {
    let (_, _, mut tree) = passage_with(vec![ContentNode::text("cats")]);
    let root = tree.root();
    let mut enchantment = Enchantment::new(Selection::classify("cats")).with_attr("class", "glow");
    enchantment.enchant(&mut tree, root).unwrap();
    assert_eq!(
        tree.find_by_tag_attr(root, tags::ENCHANTMENT, "class", "glow")
            .len(),
        1
    );

    // More matching text arrives; a re-run picks it up and nothing is
    // double-wrapped.
    let extra = tree.create_text(" and cats");
    tree.append_child(root, extra).unwrap();
    enchantment.enchant(&mut tree, root).unwrap();
    let wrapped = tree.find_by_tag_attr(root, tags::ENCHANTMENT, "class", "glow");
    assert_eq!(wrapped.len(), 2);
    for w in wrapped {
        assert_eq!(tree.text_content(w), "cats");
    }
}

#[test]
fn hook_enchantment_wraps_the_anchor_elements() {
    let (_, _, mut tree) = passage_with(vec![
        ContentNode::hook("top", vec![ContentNode::text("a")]),
        ContentNode::hook("top", vec![ContentNode::text("b")]),
    ]);
    let root = tree.root();
    let mut enchantment = Enchantment::new(Selection::classify("?top")).with_attr("class", "glow");
    enchantment.enchant(&mut tree, root).unwrap();
    let wrapped = tree.find_by_tag_attr(root, tags::ENCHANTMENT, "class", "glow");
    assert_eq!(wrapped.len(), 2);
    for w in wrapped {
        let kids = tree.children(w).unwrap();
        assert_eq!(kids.len(), 1);
        assert_eq!(tree.node(kids[0]).unwrap().tag(), Some(tags::HOOK));
    }
}

#[test]
fn section_refreshes_registered_enchantments_after_a_pass() {
    let registry = Registry::with_builtins();
    let mut history = History::new();
    let mut tree = RenderTree::new(tags::PASSAGE);
    let root = tree.root();
    let mut section = Section::new(&registry, &mut history, &mut tree);
    section.add_enchantment(Enchantment::new(Selection::classify("cats")).with_attr("class", "glow"));
    section
        .render_into(&[ContentNode::text("cats and cats")], root)
        .unwrap();
    assert_eq!(
        tree.find_by_tag_attr(root, tags::ENCHANTMENT, "class", "glow")
            .len(),
        2
    );
}
