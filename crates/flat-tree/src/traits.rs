//! Read-only navigation over the loaded part of a tree

use std::collections::VecDeque;

use crate::node::{Node, NodeId, NodeKind};
use crate::registry::Registry;

/// A hierarchical structure that can be navigated by id
///
/// Only what has been loaded is reachable: an unloaded branch reports no
/// children.
///
/// # Example
///
/// ```
/// use flat_tree::{NodeId, Tree, TraversalOrder, TreeTraversal};
///
/// fn outline<T: Tree>(tree: &T) -> Vec<(usize, NodeId)> {
///     tree.walk(TraversalOrder::PreOrder)
///         .map(|id| (tree.depth(id), id))
///         .collect()
/// }
/// ```
pub trait Tree {
    /// Payload carried by every node
    type NodeData;

    fn root(&self) -> NodeId;

    /// `None` once the node has been unregistered
    fn get(&self, id: NodeId) -> Option<&Node<Self::NodeData>>;

    /// `None` for the root and for unknown ids
    fn parent(&self, id: NodeId) -> Option<NodeId>;

    /// Iterate over loaded children of a node
    ///
    /// Returns an empty iterator for leaves, unloaded branches, or invalid IDs.
    fn children(&self, id: NodeId) -> Box<dyn Iterator<Item = NodeId> + '_>;

    fn node_count(&self) -> usize;

    fn is_leaf(&self, id: NodeId) -> bool {
        self.get(id)
            .map(|n| n.kind() == NodeKind::Leaf)
            .unwrap_or(false)
    }

    fn is_branch(&self, id: NodeId) -> bool {
        self.get(id)
            .map(|n| n.kind() == NodeKind::Branch)
            .unwrap_or(false)
    }

    /// Number of parent links between `id` and the root
    ///
    /// Not cached; a move changes the depth of a whole subtree. Unknown ids
    /// report 0.
    fn depth(&self, id: NodeId) -> usize {
        std::iter::successors(self.parent(id), |&up| self.parent(up)).count()
    }

    fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    /// Parent first, root last; empty for the root itself
    fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        std::iter::successors(self.parent(id), |&up| self.parent(up)).collect()
    }

    /// Strict ancestry: a node is not its own ancestor
    fn is_ancestor_of(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        std::iter::successors(self.parent(descendant), |&up| self.parent(up))
            .any(|up| up == ancestor)
    }
}

impl<D> Tree for Registry<D> {
    type NodeData = D;

    fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    fn get(&self, id: NodeId) -> Option<&Node<D>> {
        Registry::get(self, id)
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent_of(id)
    }

    fn children(&self, id: NodeId) -> Box<dyn Iterator<Item = NodeId> + '_> {
        match Registry::get(self, id).and_then(Node::children) {
            Some(children) => Box::new(children.iter().copied()),
            None => Box::new(std::iter::empty()),
        }
    }

    fn node_count(&self) -> usize {
        self.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraversalOrder {
    /// A branch, then each child subtree in order
    PreOrder,
    /// Each child subtree, then the branch
    PostOrder,
    /// All nodes at one depth before the next depth
    BreadthFirst,
}

/// Walks and searches, available on every [`Tree`]
pub trait TreeTraversal: Tree {
    fn walk(&self, order: TraversalOrder) -> TreeWalker<'_, Self>
    where
        Self: Sized,
    {
        TreeWalker::new(self, self.root(), order)
    }

    /// Walk only the subtree under `start`, `start` included
    fn walk_from(&self, start: NodeId, order: TraversalOrder) -> TreeWalker<'_, Self>
    where
        Self: Sized,
    {
        TreeWalker::new(self, start, order)
    }

    /// Get all reachable leaf nodes
    fn leaves(&self) -> Vec<NodeId>
    where
        Self: Sized,
    {
        self.walk(TraversalOrder::PreOrder)
            .filter(|&id| self.is_leaf(id))
            .collect()
    }

    /// Get all reachable branch nodes
    fn branches(&self) -> Vec<NodeId>
    where
        Self: Sized,
    {
        self.walk(TraversalOrder::PreOrder)
            .filter(|&id| self.is_branch(id))
            .collect()
    }

    /// Find reachable nodes matching a predicate
    fn find<F>(&self, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&Node<Self::NodeData>) -> bool,
        Self: Sized,
    {
        self.walk(TraversalOrder::PreOrder)
            .filter(|&id| self.get(id).map(&predicate).unwrap_or(false))
            .collect()
    }
}

impl<T: Tree> TreeTraversal for T {}

/// Iterator returned by [`TreeTraversal::walk`]
pub struct TreeWalker<'a, T: Tree + ?Sized> {
    tree: &'a T,
    order: TraversalOrder,
    /// Work list: used as a stack for the depth-first orders and as a queue
    /// for breadth-first. The flag marks post-order entries whose children
    /// were already pushed.
    pending: VecDeque<(NodeId, bool)>,
}

impl<'a, T: Tree + ?Sized> TreeWalker<'a, T> {
    /// Yields nothing when `start` is not registered
    pub fn new(tree: &'a T, start: NodeId, order: TraversalOrder) -> Self {
        let pending = tree
            .get(start)
            .map(|_| (start, false))
            .into_iter()
            .collect();
        Self {
            tree,
            order,
            pending,
        }
    }

    /// Push children so the first child is popped next
    fn push_children(&mut self, id: NodeId) {
        let children: Vec<_> = self.tree.children(id).collect();
        for child in children.into_iter().rev() {
            self.pending.push_back((child, false));
        }
    }
}

impl<T: Tree + ?Sized> Iterator for TreeWalker<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        match self.order {
            TraversalOrder::PreOrder => {
                let (id, _) = self.pending.pop_back()?;
                self.push_children(id);
                Some(id)
            }
            TraversalOrder::PostOrder => loop {
                let (id, opened) = self.pending.pop_back()?;
                if opened {
                    return Some(id);
                }
                self.pending.push_back((id, true));
                self.push_children(id);
            },
            TraversalOrder::BreadthFirst => {
                let (id, _) = self.pending.pop_front()?;
                let children = self.tree.children(id).map(|child| (child, false));
                self.pending.extend(children);
                Some(id)
            }
        }
    }
}
