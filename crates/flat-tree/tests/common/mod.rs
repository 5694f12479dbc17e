//! Shared fixture: an in-memory data source that can be held open or made to fail

#![allow(dead_code)]

use flat_tree::{FlatTree, Node, NodeFactory, NodeId, TraversalOrder, TreeTraversal};
use futures::channel::oneshot;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// root
/// ├── A/
/// │   ├── A1/
/// │   │   └── A1a
/// │   └── A2
/// ├── B/         (empty)
/// └── C
pub fn layout(name: &str) -> &'static [(&'static str, bool)] {
    match name {
        "root" => &[("A", true), ("B", true), ("C", false)],
        "A" => &[("A1", true), ("A2", false)],
        "A1" => &[("A1a", false)],
        _ => &[],
    }
}

#[derive(Clone, Default)]
pub struct Fixture {
    calls: Rc<RefCell<Vec<&'static str>>>,
    gates: Rc<RefCell<HashMap<&'static str, oneshot::Receiver<()>>>>,
    failing: Rc<RefCell<HashSet<&'static str>>>,
}

impl Fixture {
    pub fn new() -> Self {
        init_logging();
        Self::default()
    }

    /// A tree over [`layout`] that records every load
    pub fn tree(&self) -> FlatTree<&'static str> {
        let fixture = self.clone();
        FlatTree::new(
            move |branch: &Node<&'static str>, factory: NodeFactory| {
                let name = branch.data;
                fixture.calls.borrow_mut().push(name);
                let gate = fixture.gates.borrow_mut().remove(name);
                let fail = fixture.failing.borrow().contains(name);
                let children: Vec<_> = layout(name)
                    .iter()
                    .map(|&(child, is_branch)| {
                        if is_branch {
                            factory.create_branch(child, false)
                        } else {
                            factory.create_leaf(child)
                        }
                    })
                    .collect();
                async move {
                    if let Some(gate) = gate {
                        let _ = gate.await;
                    }
                    if fail {
                        anyhow::bail!("cannot load {}", name);
                    }
                    Ok(children)
                }
            },
            "root",
        )
    }

    /// Hold the next load of `name` until the returned sender fires
    pub fn gate(&self, name: &'static str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.borrow_mut().insert(name, rx);
        tx
    }

    pub fn fail(&self, name: &'static str) {
        self.failing.borrow_mut().insert(name);
    }

    pub fn heal(&self, name: &'static str) {
        self.failing.borrow_mut().remove(name);
    }

    /// How often the data source was asked for `name`
    pub fn loads(&self, name: &str) -> usize {
        self.calls.borrow().iter().filter(|&&c| c == name).count()
    }
}

/// Route `log` output through the test harness; `RUST_LOG=debug` shows loads
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Id of the registered node called `name`
pub fn id(tree: &FlatTree<&'static str>, name: &str) -> NodeId {
    let found = tree.read().find(|node| node.data == name);
    assert_eq!(found.len(), 1, "expected exactly one node called {}", name);
    found[0]
}

pub fn labels(tree: &FlatTree<&'static str>, ids: &[NodeId]) -> Vec<&'static str> {
    ids.iter()
        .map(|&id| tree.get(id).map(|n| n.data).unwrap_or("?"))
        .collect()
}

pub fn visible(tree: &FlatTree<&'static str>) -> Vec<&'static str> {
    let ids = tree.visible_nodes().to_vec();
    labels(tree, &ids)
}

pub fn flat_view(tree: &FlatTree<&'static str>, name: &str) -> Option<Vec<&'static str>> {
    let ids = tree.flat_view(id(tree, name))?.to_vec();
    Some(labels(tree, &ids))
}

/// What a branch's standalone sequence must hold: its children in order, each
/// followed by the descendants of loaded children that are inlined
pub fn expected_sequence<D: 'static>(tree: &FlatTree<D>, branch: NodeId) -> Vec<NodeId> {
    let mut sequence = Vec::new();
    for child in tree.children(branch).unwrap_or_default() {
        sequence.push(child);
        if tree.is_loaded(child) && tree.flat_view(child).is_none() {
            sequence.extend(expected_sequence(tree, child));
        }
    }
    sequence
}

/// Check every standalone sequence against the child lists, and that each
/// registered node other than the root is held by exactly one sequence
pub fn assert_projection_consistent<D: 'static>(tree: &FlatTree<D>) {
    let reachable: Vec<NodeId> = tree.read().walk(TraversalOrder::PreOrder).collect();
    assert_eq!(reachable.len(), tree.node_count(), "unreachable nodes are still registered");

    let mut held = 0;
    for &branch in &reachable {
        if branch != tree.root() && tree.is_loaded(branch) && tree.flat_view(branch).is_none() {
            assert!(tree.intends_expanded(branch), "{} is inlined but not expanded", branch);
        }
        let Some(view) = tree.flat_view(branch).map(|v| v.to_vec()) else {
            continue;
        };
        if tree.is_loaded(branch) {
            assert_eq!(view, expected_sequence(tree, branch), "flat view of {}", branch);
        } else {
            assert!(view.is_empty(), "unloaded {} holds rows", branch);
        }
        held += view.len();
    }
    assert_eq!(held, tree.node_count() - 1, "projection conservation");
}
