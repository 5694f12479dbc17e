mod common;

use common::{assert_projection_consistent, flat_view, id, visible, Fixture};
use flat_tree::{ExpandOptions, FlatTree, Node, NodeFactory, TreeError};
use futures::executor::{block_on, LocalPool};
use futures::future;
use futures::task::LocalSpawnExt;
use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn expand() -> ExpandOptions {
    ExpandOptions::default()
}

#[test]
fn test_expand_collapse_scenario() {
    let fixture = Fixture::new();
    let tree = fixture.tree();
    assert!(visible(&tree).is_empty());
    assert!(!tree.is_expanded(tree.root()));

    block_on(tree.expand(tree.root(), expand())).unwrap();
    assert_eq!(visible(&tree), vec!["A", "B", "C"]);
    assert!(tree.is_expanded(tree.root()));

    let a = id(&tree, "A");
    block_on(tree.expand(a, expand())).unwrap();
    assert_eq!(visible(&tree), vec!["A", "A1", "A2", "B", "C"]);
    assert!(tree.is_expanded(a));
    assert_eq!(flat_view(&tree, "A"), None);

    tree.collapse(a).unwrap();
    assert_eq!(visible(&tree), vec!["A", "B", "C"]);
    assert_eq!(flat_view(&tree, "A"), Some(vec!["A1", "A2"]));
    assert!(!tree.is_expanded(a));
    assert!(!tree.intends_expanded(a));

    block_on(tree.expand(a, expand())).unwrap();
    assert_eq!(visible(&tree), vec!["A", "A1", "A2", "B", "C"]);
    assert_eq!(fixture.loads("A"), 1);
    assert_projection_consistent(&tree);
}

#[test]
fn test_expand_is_idempotent() {
    let fixture = Fixture::new();
    let tree = fixture.tree();
    block_on(tree.expand(tree.root(), expand())).unwrap();
    let a = id(&tree, "A");
    block_on(tree.expand(a, expand())).unwrap();

    let notified = Rc::new(Cell::new(0));
    let counter = Rc::clone(&notified);
    tree.on_visible_nodes_change(move |_| counter.set(counter.get() + 1));

    block_on(tree.expand(a, expand())).unwrap();
    block_on(tree.expand(a, expand().ensure_visible(true))).unwrap();
    assert_eq!(fixture.loads("A"), 1);
    assert_eq!(notified.get(), 0);
    assert_eq!(visible(&tree), vec!["A", "A1", "A2", "B", "C"]);
}

#[test]
fn test_collapse_is_idempotent() {
    let fixture = Fixture::new();
    let tree = fixture.tree();
    block_on(tree.expand(tree.root(), expand())).unwrap();
    let a = id(&tree, "A");
    let b = id(&tree, "B");

    // never expanded, and unloaded
    tree.collapse(a).unwrap();
    tree.collapse(a).unwrap();
    assert!(!tree.is_loaded(a));
    assert_eq!(visible(&tree), vec!["A", "B", "C"]);

    // expanded but empty
    block_on(tree.expand(b, expand())).unwrap();
    assert!(tree.is_expanded(b));
    tree.collapse(b).unwrap();
    tree.collapse(b).unwrap();
    assert!(!tree.is_expanded(b));
    assert_eq!(flat_view(&tree, "B"), Some(vec![]));
    assert_eq!(visible(&tree), vec!["A", "B", "C"]);

    // the root cannot be collapsed
    tree.collapse(tree.root()).unwrap();
    assert!(tree.intends_expanded(tree.root()));
    assert!(tree.is_expanded(tree.root()));
    assert_eq!(visible(&tree), vec!["A", "B", "C"]);
}

#[test]
fn test_round_trip_keeps_nested_expansion() {
    let fixture = Fixture::new();
    let tree = fixture.tree();
    block_on(tree.expand(tree.root(), expand())).unwrap();
    let a = id(&tree, "A");
    block_on(tree.expand(a, expand())).unwrap();
    let a1 = id(&tree, "A1");
    block_on(tree.expand(a1, expand())).unwrap();
    let before = visible(&tree);
    assert_eq!(before, vec!["A", "A1", "A1a", "A2", "B", "C"]);

    tree.collapse(a).unwrap();
    assert_eq!(visible(&tree), vec!["A", "B", "C"]);
    assert_eq!(flat_view(&tree, "A"), Some(vec!["A1", "A1a", "A2"]));

    // A1 still intends to be expanded and is inlined into A, but cannot be seen
    assert!(tree.is_expanded(a1));
    assert!(!tree.is_visible(a1));
    assert!(!tree.is_visible(id(&tree, "A1a")));

    block_on(tree.expand(a, expand())).unwrap();
    assert_eq!(visible(&tree), before);
    assert_eq!(fixture.loads("A"), 1);
    assert_eq!(fixture.loads("A1"), 1);
    assert_projection_consistent(&tree);
}

#[test]
fn test_ensure_visible_expands_ancestors() {
    let fixture = Fixture::new();
    let tree = fixture.tree();
    block_on(tree.ensure_loaded(tree.root())).unwrap();
    let a = id(&tree, "A");
    block_on(tree.ensure_loaded(a)).unwrap();
    let a1 = id(&tree, "A1");

    // without ensure_visible A1 is expanded inside the collapsed A
    block_on(tree.expand(a1, expand())).unwrap();
    assert!(tree.is_expanded(a1));
    assert!(!tree.is_visible(a1));
    assert_eq!(visible(&tree), vec!["A", "B", "C"]);

    block_on(tree.expand(a1, expand().ensure_visible(true))).unwrap();
    assert!(tree.is_visible(a1));
    assert!(tree.is_expanded(a));
    assert_eq!(visible(&tree), vec!["A", "A1", "A1a", "A2", "B", "C"]);
    assert_projection_consistent(&tree);
}

#[test]
fn test_recursive_expand() {
    let fixture = Fixture::new();
    let tree = fixture.tree();
    block_on(tree.expand(tree.root(), expand().recursive(true))).unwrap();
    assert_eq!(visible(&tree), vec!["A", "A1", "A1a", "A2", "B", "C"]);
    assert_eq!(tree.node_count(), 7);
    assert_projection_consistent(&tree);
}

#[test]
fn test_recursive_expand_keeps_successful_siblings() {
    let fixture = Fixture::new();
    fixture.fail("A1");
    let tree = fixture.tree();

    let err = block_on(tree.expand(tree.root(), expand().recursive(true))).unwrap_err();
    let a1 = id(&tree, "A1");
    assert!(matches!(err, TreeError::Load { branch, .. } if branch == a1));

    assert!(tree.is_expanded(id(&tree, "A")));
    assert!(tree.is_expanded(id(&tree, "B")));
    assert!(!tree.is_loaded(a1));
    assert_eq!(visible(&tree), vec!["A", "A1", "A2", "B", "C"]);
    assert_projection_consistent(&tree);
}

#[test]
fn test_load_failure_leaves_branch_unloaded() {
    let fixture = Fixture::new();
    let tree = fixture.tree();
    block_on(tree.expand(tree.root(), expand())).unwrap();
    let a = id(&tree, "A");

    fixture.fail("A");
    let err = block_on(tree.expand(a, expand())).unwrap_err();
    assert_eq!(err.to_string(), format!("failed to load children of {}: cannot load A", a));
    assert!(!tree.is_loaded(a));
    assert!(!tree.is_expanded(a));
    // the intent survives the failure
    assert!(tree.intends_expanded(a));
    assert_eq!(visible(&tree), vec!["A", "B", "C"]);

    fixture.heal("A");
    block_on(tree.expand(a, expand())).unwrap();
    assert_eq!(fixture.loads("A"), 2);
    assert_eq!(visible(&tree), vec!["A", "A1", "A2", "B", "C"]);
}

#[test]
fn test_concurrent_expands_share_one_load() {
    let fixture = Fixture::new();
    let tree = fixture.tree();
    block_on(tree.expand(tree.root(), expand())).unwrap();
    let a = id(&tree, "A");
    let release = fixture.gate("A");

    let mut pool = LocalPool::new();
    let results = Rc::new(RefCell::new(Vec::new()));
    for _ in 0..2 {
        let expanding = tree.expand(a, expand());
        let results = Rc::clone(&results);
        pool.spawner()
            .spawn_local(async move {
                let result = expanding.await;
                results.borrow_mut().push(result);
            })
            .unwrap();
    }
    pool.run_until_stalled();
    assert_eq!(fixture.loads("A"), 1);
    assert!(tree.intends_expanded(a));
    assert!(!tree.is_expanded(a));
    assert!(results.borrow().is_empty());

    release.send(()).unwrap();
    pool.run_until_stalled();
    assert_eq!(results.borrow().len(), 2);
    assert!(results.borrow().iter().all(Result::is_ok));
    assert_eq!(fixture.loads("A"), 1);
    assert_eq!(visible(&tree), vec!["A", "A1", "A2", "B", "C"]);
    assert_projection_consistent(&tree);
}

#[test]
fn test_collapse_during_load_wins() {
    let fixture = Fixture::new();
    let tree = fixture.tree();
    block_on(tree.expand(tree.root(), expand())).unwrap();
    let a = id(&tree, "A");
    let release = fixture.gate("A");

    let mut pool = LocalPool::new();
    let result = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&result);
    let expanding = tree.expand(a, expand());
    pool.spawner()
        .spawn_local(async move {
            let outcome = expanding.await;
            *sink.borrow_mut() = Some(outcome);
        })
        .unwrap();
    pool.run_until_stalled();

    tree.collapse(a).unwrap();
    release.send(()).unwrap();
    pool.run_until_stalled();

    assert!(matches!(*result.borrow(), Some(Ok(()))));
    assert!(!tree.is_expanded(a));
    assert!(tree.is_loaded(a));
    assert_eq!(flat_view(&tree, "A"), Some(vec!["A1", "A2"]));
    assert_eq!(visible(&tree), vec!["A", "B", "C"]);

    // cached children come back without another load
    block_on(tree.expand(a, expand())).unwrap();
    assert_eq!(visible(&tree), vec!["A", "A1", "A2", "B", "C"]);
    assert_eq!(fixture.loads("A"), 1);
}

#[test]
fn test_reload_replaces_children() {
    let fixture = Fixture::new();
    let tree = fixture.tree();
    block_on(tree.expand(tree.root(), expand())).unwrap();
    let a = id(&tree, "A");
    block_on(tree.expand(a, expand())).unwrap();
    let old_a1 = id(&tree, "A1");

    block_on(tree.reload(a)).unwrap();
    assert_eq!(fixture.loads("A"), 2);
    assert!(tree.get(old_a1).is_none());
    assert_ne!(id(&tree, "A1"), old_a1);
    assert_eq!(visible(&tree), vec!["A", "A1", "A2", "B", "C"]);
    assert!(tree.is_expanded(a));
    assert_projection_consistent(&tree);
}

#[test]
fn test_leaves_cannot_be_expanded() {
    let fixture = Fixture::new();
    let tree = fixture.tree();
    block_on(tree.expand(tree.root(), expand())).unwrap();
    let c = id(&tree, "C");
    assert!(matches!(
        block_on(tree.expand(c, expand())),
        Err(TreeError::NotABranch(node)) if node == c
    ));
    assert!(!tree.is_expanded(c));
    assert!(tree.is_visible(c));
}

/// A tree whose data source marks some child branches as expanded up front
///
/// Each entry is `(name, is_branch, expanded)`. Loading a name listed in
/// `failing` fails.
fn preexpanded_tree(
    layout: fn(&str) -> &'static [(&'static str, bool, bool)],
    failing: &'static [&'static str],
) -> FlatTree<&'static str> {
    FlatTree::new(
        move |branch: &Node<&'static str>, factory: NodeFactory| {
            let name = branch.data;
            let result: anyhow::Result<Vec<_>> = if failing.contains(&name) {
                Err(anyhow::anyhow!("cannot load {}", name))
            } else {
                Ok(layout(name)
                    .iter()
                    .map(|&(child, is_branch, expanded)| {
                        if is_branch {
                            factory.create_branch(child, expanded)
                        } else {
                            factory.create_leaf(child)
                        }
                    })
                    .collect())
            };
            future::ready(result)
        },
        "root",
    )
}

#[test]
fn test_loaded_children_marked_expanded_are_expanded() {
    common::init_logging();
    let tree = preexpanded_tree(
        |name| match name {
            "root" => &[("A", true, true), ("C", false, false)],
            "A" => &[("A1", true, true)],
            "A1" => &[("x", false, false)],
            _ => &[],
        },
        &[],
    );

    block_on(tree.ensure_loaded(tree.root())).unwrap();
    assert_eq!(visible(&tree), vec!["A", "A1", "x", "C"]);
    assert!(tree.is_expanded(id(&tree, "A")));
    assert!(tree.is_expanded(id(&tree, "A1")));
    assert_projection_consistent(&tree);
}

#[test]
fn test_expanded_children_of_collapsed_branch_stay_buried() {
    common::init_logging();
    let tree = preexpanded_tree(
        |name| match name {
            "root" => &[("P", true, false)],
            "P" => &[("Q", true, true), ("y", false, false)],
            "Q" => &[("z", false, false)],
            _ => &[],
        },
        &[],
    );
    block_on(tree.ensure_loaded(tree.root())).unwrap();
    let p = id(&tree, "P");

    block_on(tree.ensure_loaded(p)).unwrap();
    let q = id(&tree, "Q");
    assert!(!tree.is_expanded(p));
    assert!(tree.is_expanded(q));
    assert!(!tree.is_visible(q));
    assert_eq!(visible(&tree), vec!["P"]);
    assert_eq!(flat_view(&tree, "P"), Some(vec!["Q", "z", "y"]));

    block_on(tree.expand(p, expand())).unwrap();
    assert_eq!(visible(&tree), vec!["P", "Q", "z", "y"]);
    assert_projection_consistent(&tree);
}

#[test]
fn test_failed_child_expansion_does_not_fail_parent_load() {
    common::init_logging();
    let tree = preexpanded_tree(
        |name| match name {
            "root" => &[("A", true, true), ("C", false, false)],
            "A" => &[("A1", true, true), ("A2", false, false)],
            _ => &[],
        },
        &["A1"],
    );

    block_on(tree.ensure_loaded(tree.root())).unwrap();
    let a1 = id(&tree, "A1");
    assert!(!tree.is_loaded(a1));
    assert!(!tree.is_expanded(a1));
    assert!(tree.intends_expanded(a1));
    assert_eq!(visible(&tree), vec!["A", "A1", "A2", "C"]);
    assert_projection_consistent(&tree);

    // the failure is not cached; an explicit expand tries again and fails
    assert!(matches!(
        block_on(tree.expand(a1, expand())),
        Err(TreeError::Load { branch, .. }) if branch == a1
    ));
}
