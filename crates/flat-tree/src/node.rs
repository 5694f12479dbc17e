//! Core node types for the tree engine

use std::fmt;

/// Unique identifier for a node within a tree
///
/// Ids are handed out by the owning tree from a strictly increasing counter
/// and are never reused, even after the node is removed. The root always
/// receives the first id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The root node always has ID 0
    pub const ROOT: NodeId = NodeId(0);

    /// Create a new NodeId from a raw integer
    pub const fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// Get the inner integer value
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Slot of this id in the arena
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        NodeId(id)
    }
}

impl From<NodeId> for u32 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// The type/kind of a node in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A node that can own children (e.g., directory)
    Branch,
    /// A node without children (e.g., file)
    Leaf,
}

impl NodeKind {
    /// Returns true if this is a branch node
    pub const fn is_branch(self) -> bool {
        matches!(self, NodeKind::Branch)
    }

    /// Returns true if this is a leaf node
    pub const fn is_leaf(self) -> bool {
        matches!(self, NodeKind::Leaf)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Branch => write!(f, "Branch"),
            NodeKind::Leaf => write!(f, "Leaf"),
        }
    }
}

/// Child list and expansion intent of a branch
#[derive(Debug, Clone, Default)]
pub(crate) struct BranchState {
    /// `None` until the children have been loaded. Empty and unloaded are
    /// different states.
    pub(crate) children: Option<Vec<NodeId>>,
    /// What the caller asked for, not what is currently visible
    pub(crate) expanded: bool,
}

/// A single node in the tree
///
/// Generic over the payload `D`, which the engine stores but never looks at.
/// Depth is not stored; ask the tree for it.
#[derive(Debug, Clone)]
pub struct Node<D> {
    id: NodeId,
    parent: Option<NodeId>,
    pub(crate) branch: Option<BranchState>,
    /// Caller supplied payload
    pub data: D,
}

impl<D> Node<D> {
    pub(crate) fn new_branch(id: NodeId, parent: Option<NodeId>, data: D, expanded: bool) -> Self {
        Self {
            id,
            parent,
            branch: Some(BranchState {
                children: None,
                expanded,
            }),
            data,
        }
    }

    pub(crate) fn new_leaf(id: NodeId, parent: Option<NodeId>, data: D) -> Self {
        Self {
            id,
            parent,
            branch: None,
            data,
        }
    }

    /// This node's id
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Id of the owning branch, `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: NodeId) {
        self.parent = Some(parent);
    }

    /// Whether this is a branch or a leaf
    pub fn kind(&self) -> NodeKind {
        if self.branch.is_some() {
            NodeKind::Branch
        } else {
            NodeKind::Leaf
        }
    }

    /// Returns true if this is a branch node
    pub fn is_branch(&self) -> bool {
        self.branch.is_some()
    }

    /// Returns true if this is a leaf node
    pub fn is_leaf(&self) -> bool {
        self.branch.is_none()
    }

    /// Loaded children in display order
    ///
    /// `None` for leaves and for branches whose children were never loaded.
    pub fn children(&self) -> Option<&[NodeId]> {
        self.branch.as_ref()?.children.as_deref()
    }

    /// Returns true if this is a branch whose children have been loaded
    pub fn is_loaded(&self) -> bool {
        self.children().is_some()
    }

    /// The optimistic expansion flag
    ///
    /// Set the moment an expand is requested, before loading finishes, and
    /// cleared by collapse. It does not say whether the children are on
    /// screen; see [`FlatTree::is_expanded`](crate::FlatTree::is_expanded).
    pub fn intends_expanded(&self) -> bool {
        self.branch.as_ref().map(|b| b.expanded).unwrap_or(false)
    }
}

impl<D: fmt::Display> fmt::Display for Node<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) - {}", self.id, self.kind(), self.data)
    }
}
