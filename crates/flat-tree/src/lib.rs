//! Flat Tree
//!
//! A lazily loaded tree that keeps a flattened, ordered list of its visible
//! nodes up to date as branches are expanded, collapsed, edited and moved,
//! ready to back a virtualized list.
//!
//! # Core Concepts
//!
//! - **FlatTree**: the engine; owns every node and the visible projection
//! - **DataSource**: supplies the children of a branch when they are first needed
//! - **Node**: a branch (which may own children) or a leaf, carrying a payload
//! - **Flat view**: the ordered ids shown under a branch; the root's flat
//!   view is what gets rendered
//!
//! Work is only ever done on the part of the projection that belongs to the
//! branch being changed, never on the whole tree.
//!
//! # Example
//!
//! ```no_run
//! use flat_tree::prelude::*;
//! use futures::executor::block_on;
//!
//! let tree = FilesystemSource::default().open("./src").expect("not a directory");
//! block_on(tree.expand(tree.root(), ExpandOptions::new().recursive(true))).expect("load failed");
//!
//! for &id in tree.visible_nodes().iter() {
//!     let depth = tree.depth(id).unwrap_or(0);
//!     let node = tree.get(id).unwrap();
//!     println!("{:indent$}{}", "", node.data, indent = depth * 2);
//! }
//! ```

mod draft;
mod error;
mod filesystem;
mod flat_view;
mod node;
mod options;
mod projection;
mod registry;
mod source;
pub mod splice;
mod subject;
mod traits;
mod tree;

pub use draft::{Draft, IntoReplacement};
pub use error::{Result, TreeError};
pub use filesystem::{FileData, FilesystemSource};
pub use node::{Node, NodeId, NodeKind};
pub use options::{ExpandOptions, FilesystemOptions};
pub use registry::{NodeFactory, Registry};
pub use source::{DataSource, LoadFuture};
pub use subject::{Subject, SubscriptionId};
pub use traits::{TraversalOrder, Tree, TreeTraversal, TreeWalker};
pub use tree::FlatTree;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        DataSource, Draft, ExpandOptions, FileData, FilesystemOptions, FilesystemSource,
        FlatTree, Node, NodeFactory, NodeId, NodeKind, TraversalOrder, Tree, TreeError,
        TreeTraversal,
    };
}
