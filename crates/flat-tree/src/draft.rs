//! Transactional editing of a branch's children

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::node::{Node, NodeId};
use crate::registry::{NodeFactory, Registry};

/// A scratch copy of a branch's child list, handed out by
/// [`FlatTree::produce`](crate::FlatTree::produce)
///
/// Every write marks the draft modified. Nodes created through the draft are
/// only registered if they are still in the list when the transaction ends.
pub struct Draft<'a, D> {
    registry: &'a Registry<D>,
    factory: NodeFactory,
    original: Vec<NodeId>,
    ids: Vec<NodeId>,
    created: HashMap<NodeId, Node<D>>,
    modified: bool,
}

impl<'a, D> Draft<'a, D> {
    pub(crate) fn new(registry: &'a Registry<D>, factory: NodeFactory, original: Vec<NodeId>) -> Self {
        Self {
            registry,
            factory,
            ids: original.clone(),
            original,
            created: HashMap::new(),
            modified: false,
        }
    }

    /// The branch being edited
    pub fn branch(&self) -> NodeId {
        self.factory.parent()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The child list as it currently stands
    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.ids.get(index).copied()
    }

    /// Resolve an id, including nodes created in this transaction
    pub fn node(&self, id: NodeId) -> Option<&Node<D>> {
        self.created.get(&id).or_else(|| self.registry.get(id))
    }

    /// Whether anything has been written since the draft was created or reverted
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    fn touch(&mut self) -> &mut Vec<NodeId> {
        self.modified = true;
        &mut self.ids
    }

    /// Replace the child at `index`, returning the previous one
    pub fn set(&mut self, index: usize, id: NodeId) -> Option<NodeId> {
        if index >= self.ids.len() {
            return None;
        }
        Some(std::mem::replace(&mut self.touch()[index], id))
    }

    pub fn push(&mut self, id: NodeId) {
        self.touch().push(id);
    }

    /// Insert at `index`, clamped to the end of the list
    pub fn insert(&mut self, index: usize, id: NodeId) {
        let index = index.min(self.ids.len());
        self.touch().insert(index, id);
    }

    pub fn remove(&mut self, index: usize) -> Option<NodeId> {
        if index >= self.ids.len() {
            return None;
        }
        Some(self.touch().remove(index))
    }

    pub fn pop(&mut self) -> Option<NodeId> {
        if self.ids.is_empty() {
            return None;
        }
        self.touch().pop()
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        if a < self.ids.len() && b < self.ids.len() {
            self.touch().swap(a, b);
        }
    }

    pub fn reverse(&mut self) {
        self.touch().reverse();
    }

    pub fn retain(&mut self, keep: impl FnMut(&NodeId) -> bool) {
        self.touch().retain(keep);
    }

    pub fn truncate(&mut self, len: usize) {
        self.touch().truncate(len);
    }

    pub fn clear(&mut self) {
        self.touch().clear();
    }

    /// Create a branch and insert it at `index`, or append it when `index` is `None`
    pub fn insert_branch(&mut self, data: D, expanded: bool, index: Option<usize>) -> NodeId {
        let node = self.factory.create_branch(data, expanded);
        self.place(node, index)
    }

    /// Create a leaf and insert it at `index`, or append it when `index` is `None`
    pub fn insert_leaf(&mut self, data: D, index: Option<usize>) -> NodeId {
        let node = self.factory.create_leaf(data);
        self.place(node, index)
    }

    fn place(&mut self, node: Node<D>, index: Option<usize>) -> NodeId {
        let id = node.id();
        self.created.insert(id, node);
        match index {
            Some(index) => self.insert(index, id),
            None => self.push(id),
        }
        id
    }

    /// Stable sort by comparing nodes
    ///
    /// Ids that resolve to no node sort last, in their current order.
    pub fn sort_by(&mut self, mut compare: impl FnMut(&Node<D>, &Node<D>) -> Ordering) {
        let mut ids = std::mem::take(&mut self.ids);
        ids.sort_by(|a, b| match (self.node(*a), self.node(*b)) {
            (Some(a), Some(b)) => compare(a, b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        self.ids = ids;
        self.modified = true;
    }

    /// Throw away every change and start again from the branch's children as
    /// they were before the transaction
    pub fn revert(&mut self) {
        self.ids = self.original.clone();
        self.created.clear();
        self.modified = false;
    }

    /// Take `ids` as the result. Only counts as a change if it differs from
    /// the original list.
    pub(crate) fn replace(&mut self, ids: Vec<NodeId>) {
        self.modified = ids != self.original;
        self.ids = ids;
    }

    /// The final child list and the nodes created for it
    pub(crate) fn finish(self) -> (Vec<NodeId>, Vec<Node<D>>) {
        (self.ids, self.created.into_values().collect())
    }
}

/// What a [`produce`](crate::FlatTree::produce) callback may return
///
/// `()` keeps the draft as edited. A list replaces it.
pub trait IntoReplacement {
    fn into_replacement(self) -> Option<Vec<NodeId>>;
}

impl IntoReplacement for () {
    fn into_replacement(self) -> Option<Vec<NodeId>> {
        None
    }
}

impl IntoReplacement for Vec<NodeId> {
    fn into_replacement(self) -> Option<Vec<NodeId>> {
        Some(self)
    }
}

impl IntoReplacement for Option<Vec<NodeId>> {
    fn into_replacement(self) -> Option<Vec<NodeId>> {
        self
    }
}
