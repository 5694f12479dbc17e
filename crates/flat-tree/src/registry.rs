//! Per-tree node arena and id allocation
//!
//! Parent and child links are plain [`NodeId`]s resolved through the
//! [`Registry`], so nodes never hold references to each other.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::{Result, TreeError};
use crate::node::{BranchState, Node, NodeId};

/// Strictly increasing id counter shared by a tree and the factories it hands out
#[derive(Debug, Clone, Default)]
pub(crate) struct IdAllocator {
    next: Rc<Cell<u32>>,
}

impl IdAllocator {
    pub(crate) fn allocate(&self) -> NodeId {
        let id = self.next.get();
        self.next.set(id + 1);
        NodeId(id)
    }

    /// Number of ids handed out so far
    pub(crate) fn allocated(&self) -> u32 {
        self.next.get()
    }
}

/// Creates nodes on behalf of a data source or a transaction
///
/// Every node gets a fresh id from the owning tree and its parent set to the
/// branch the factory was issued for. Nodes only become part of the tree once
/// the engine commits them.
#[derive(Debug, Clone)]
pub struct NodeFactory {
    ids: IdAllocator,
    parent: NodeId,
}

impl NodeFactory {
    pub(crate) fn new(ids: IdAllocator, parent: NodeId) -> Self {
        Self { ids, parent }
    }

    /// The branch new nodes will belong to
    pub fn parent(&self) -> NodeId {
        self.parent
    }

    /// Create a branch node
    ///
    /// A branch created with `expanded` set is expanded as soon as its
    /// parent's children are committed.
    pub fn create_branch<D>(&self, data: D, expanded: bool) -> Node<D> {
        Node::new_branch(self.ids.allocate(), Some(self.parent), data, expanded)
    }

    /// Create a leaf node
    pub fn create_leaf<D>(&self, data: D) -> Node<D> {
        Node::new_leaf(self.ids.allocate(), Some(self.parent), data)
    }
}

#[derive(Debug)]
enum Slot<D> {
    /// Handed out by a factory but never committed
    Vacant,
    Occupied(Node<D>),
    /// Registered once and removed since; the id is never accepted again
    Retired,
}

impl<D> Slot<D> {
    fn node(&self) -> Option<&Node<D>> {
        match self {
            Slot::Occupied(node) => Some(node),
            _ => None,
        }
    }
}

/// Arena mapping ids to the nodes currently registered in a tree
#[derive(Debug)]
pub struct Registry<D> {
    /// Indexed by id
    slots: Vec<Slot<D>>,
    len: usize,
    ids: IdAllocator,
}

impl<D> Registry<D> {
    /// Create a registry holding only an expanded root branch
    pub(crate) fn new(root_data: D) -> Self {
        let ids = IdAllocator::default();
        let root = Node::new_branch(ids.allocate(), None, root_data, true);
        debug_assert_eq!(root.id(), NodeId::ROOT);
        Self {
            slots: vec![Slot::Occupied(root)],
            len: 1,
            ids,
        }
    }

    pub(crate) fn factory(&self, parent: NodeId) -> NodeFactory {
        NodeFactory::new(self.ids.clone(), parent)
    }

    /// Number of registered nodes, root included
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: the root is registered for the registry's whole life
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if the id is currently registered
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Look up a node
    pub fn get(&self, id: NodeId) -> Option<&Node<D>> {
        self.slots.get(id.index())?.node()
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node<D>> {
        match self.slots.get_mut(id.index())? {
            Slot::Occupied(node) => Some(node),
            _ => None,
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&Node<D>> {
        self.get(id).ok_or(TreeError::UnknownNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<D>> {
        self.get_mut(id).ok_or(TreeError::UnknownNode(id))
    }

    pub(crate) fn branch(&self, id: NodeId) -> Result<&BranchState> {
        self.node(id)?.branch.as_ref().ok_or(TreeError::NotABranch(id))
    }

    pub(crate) fn branch_mut(&mut self, id: NodeId) -> Result<&mut BranchState> {
        self.node_mut(id)?
            .branch
            .as_mut()
            .ok_or(TreeError::NotABranch(id))
    }

    /// Parent of a registered node, `None` for the root or unknown ids
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent()
    }

    /// Whether `node` carries an id this registry handed out and has never registered
    pub(crate) fn accepts(&self, node: &Node<D>) -> bool {
        let id = node.id();
        id.get() < self.ids.allocated()
            && matches!(self.slots.get(id.index()), None | Some(Slot::Vacant))
    }

    /// Register a node produced by a factory of this registry
    pub(crate) fn insert(&mut self, node: Node<D>) -> Result<()> {
        let id = node.id();
        if !self.accepts(&node) {
            return Err(TreeError::ForeignNode {
                node: id,
                branch: node.parent().unwrap_or(NodeId::ROOT),
            });
        }
        if self.slots.len() <= id.index() {
            self.slots.resize_with(id.index() + 1, || Slot::Vacant);
        }
        self.slots[id.index()] = Slot::Occupied(node);
        self.len += 1;
        Ok(())
    }

    pub(crate) fn remove(&mut self, id: NodeId) -> Option<Node<D>> {
        let slot = self.slots.get_mut(id.index())?;
        match std::mem::replace(slot, Slot::Retired) {
            Slot::Occupied(node) => {
                self.len -= 1;
                Some(node)
            }
            other => {
                *slot = other;
                None
            }
        }
    }

    /// Iterate over all registered nodes in id order
    pub fn iter(&self) -> impl Iterator<Item = &Node<D>> + '_ {
        self.slots.iter().filter_map(Slot::node)
    }
}
