use derive_more::Display;
use std::rc::Rc;

use crate::node::NodeId;

/// Errors reported by [`FlatTree`](crate::FlatTree) operations
///
/// Everything except [`TreeError::Load`] is a caller bug: the operation was
/// given an id or a shape the tree cannot honor.
#[derive(Debug, Clone, Display)]
pub enum TreeError {
    /// The id is not (or no longer) registered in this tree
    #[display(fmt = "{} is not registered in this tree", _0)]
    UnknownNode(NodeId),
    /// A branch-only operation was called on a leaf
    #[display(fmt = "{} is not a branch", _0)]
    NotABranch(NodeId),
    /// The root cannot be removed or moved
    #[display(fmt = "the root cannot be removed or moved")]
    RootOperation,
    /// A node cannot be moved into itself or one of its descendants
    #[display(fmt = "cannot move {} under {}, which is inside its own subtree", node, target)]
    InvalidMove {
        /// The node being moved
        node: NodeId,
        /// The requested new parent
        target: NodeId,
    },
    /// A data source returned a node that its factory did not create for this branch
    #[display(fmt = "{} was not created for branch {}", node, branch)]
    ForeignNode {
        /// The offending node
        node: NodeId,
        /// The branch being loaded
        branch: NodeId,
    },
    /// A child list names the same node twice
    #[display(fmt = "{} appears more than once among the children of {}", node, branch)]
    DuplicateChild {
        /// The repeated node
        node: NodeId,
        /// The branch whose child list was being committed
        branch: NodeId,
    },
    /// A node is missing from the projection that should contain it
    #[display(fmt = "{} is missing from the flat view of {}", node, holder)]
    DetachedNode {
        /// The node that could not be located
        node: NodeId,
        /// The branch whose sequence was searched
        holder: NodeId,
    },
    /// The data source failed while loading a branch's children
    #[display(fmt = "failed to load children of {}: {}", branch, source)]
    Load {
        /// The branch whose load failed
        branch: NodeId,
        /// Shared so every caller waiting on the same load gets the error
        source: Rc<anyhow::Error>,
    },
}

impl std::error::Error for TreeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TreeError::Load { source, .. } => Some(&***source),
            _ => None,
        }
    }
}

impl TreeError {
    /// Convert into an [`anyhow::Error`] for callers that report errors
    /// across threads
    ///
    /// A load failure keeps the data source's error chain under a
    /// "failed to load children" context. When the cause is still shared
    /// with other waiters, its chain is carried as text.
    pub fn into_anyhow(self) -> anyhow::Error {
        match self {
            TreeError::Load { branch, source } => {
                let context = format!("failed to load children of {}", branch);
                match Rc::try_unwrap(source) {
                    Ok(source) => source.context(context),
                    Err(shared) => anyhow::anyhow!("{:#}", shared).context(context),
                }
            }
            other => anyhow::Error::msg(other.to_string()),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T, E = TreeError> = std::result::Result<T, E>;
