//! Where children come from
//!
//! The engine never decides what a branch contains. It asks a [`DataSource`]
//! for the children of a branch whenever they are first needed and commits
//! whatever list comes back, in that order.

use futures::future::{FutureExt, LocalBoxFuture};
use std::future::Future;

use crate::node::Node;
use crate::registry::NodeFactory;

/// Future returned by a [`DataSource`]
pub type LoadFuture<D> = LocalBoxFuture<'static, anyhow::Result<Vec<Node<D>>>>;

/// Supplies the ordered children of a branch
///
/// Implementations must create every returned node through the given
/// factory; the engine rejects nodes it did not allocate for this branch.
/// `load` itself runs synchronously while the tree is borrowed, so it must
/// not call back into mutating tree operations. The returned future may
/// take as long as it likes.
///
/// Any closure `Fn(&Node<D>, NodeFactory) -> impl Future<Output = anyhow::Result<Vec<Node<D>>>>`
/// is a data source. Synchronous sources can return `futures::future::ready(..)`.
pub trait DataSource<D> {
    /// Produce the children of `branch`
    fn load(&self, branch: &Node<D>, factory: NodeFactory) -> LoadFuture<D>;
}

impl<D, F, Fut> DataSource<D> for F
where
    F: Fn(&Node<D>, NodeFactory) -> Fut,
    Fut: Future<Output = anyhow::Result<Vec<Node<D>>>> + 'static,
{
    fn load(&self, branch: &Node<D>, factory: NodeFactory) -> LoadFuture<D> {
        self(branch, factory).boxed_local()
    }
}
