//! The tree engine
//!
//! [`FlatTree`] owns the registry, the flat views and the pending loads, and
//! is the only thing that mutates them. It is a cheap handle: clones share
//! the same tree, which is how the futures returned by [`FlatTree::expand`]
//! and friends stay `'static`.
//!
//! All state lives behind a single `RefCell`. Borrows are taken for one
//! synchronous step at a time and never held across an `.await`; after every
//! suspension point the step that resumes checks again whether it still
//! makes sense to apply.

use futures::future::{self, FutureExt, LocalBoxFuture, Shared};
use log::{debug, trace, warn};
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::draft::{Draft, IntoReplacement};
use crate::error::{Result, TreeError};
use crate::node::{Node, NodeId};
use crate::options::ExpandOptions;
use crate::projection::TreeState;
use crate::registry::Registry;
use crate::source::DataSource;
use crate::subject::{Subject, SubscriptionId};
use crate::traits::Tree;

/// An in-flight load that every interested caller can await
pub(crate) type SharedLoad = Shared<LocalBoxFuture<'static, Result<()>>>;

/// Why the data source is being asked for a branch's children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadMode {
    /// First load. Dropped if the branch got children some other way meanwhile.
    Initial,
    /// Replace whatever the branch currently holds
    Reload,
}

struct Inner<D> {
    state: RefCell<TreeState<D>>,
    source: Box<dyn DataSource<D>>,
    visible: Subject<Vec<NodeId>>,
    /// Subscription owned by [`FlatTree::on_visible_nodes_change`]
    visible_slot: Cell<Option<SubscriptionId>>,
}

/// A lazily loaded tree with an incrementally maintained visible projection
///
/// # Example
///
/// ```
/// use flat_tree::{ExpandOptions, FlatTree, Node, NodeFactory};
/// use futures::executor::block_on;
/// use futures::future;
///
/// let tree = FlatTree::new(
///     |branch: &Node<String>, factory: NodeFactory| {
///         let children = if branch.data == "root" {
///             vec![factory.create_branch("docs".to_string(), false), factory.create_leaf("README".to_string())]
///         } else {
///             vec![factory.create_leaf(format!("{}/index", branch.data))]
///         };
///         future::ready(anyhow::Ok(children))
///     },
///     "root".to_string(),
/// );
///
/// block_on(tree.expand(tree.root(), ExpandOptions::default())).unwrap();
/// assert_eq!(tree.visible_nodes().len(), 2);
///
/// let docs = tree.visible_nodes()[0];
/// block_on(tree.expand(docs, ExpandOptions::default())).unwrap();
/// assert_eq!(tree.visible_nodes().len(), 3);
/// ```
pub struct FlatTree<D: 'static> {
    inner: Rc<Inner<D>>,
}

impl<D: 'static> Clone for FlatTree<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: 'static> FlatTree<D> {
    /// Create a tree whose root branch carries `root_data`
    ///
    /// Nothing is loaded yet; expand or [`ensure_loaded`](Self::ensure_loaded)
    /// the root to populate the visible nodes.
    pub fn new(source: impl DataSource<D> + 'static, root_data: D) -> Self {
        Self {
            inner: Rc::new(Inner {
                state: RefCell::new(TreeState::new(root_data)),
                source: Box::new(source),
                visible: Subject::new(Vec::new()),
                visible_slot: Cell::new(None),
            }),
        }
    }

    /// Run one synchronous step against the state, then notify observers if
    /// the visible sequence changed
    fn with_state<R>(&self, step: impl FnOnce(&mut TreeState<D>) -> R) -> R {
        let (result, changed) = {
            let mut state = self.inner.state.borrow_mut();
            let result = step(&mut state);
            let changed = state
                .views
                .take_root_change()
                .then(|| state.views.root_view().to_vec());
            (result, changed)
        };
        if let Some(visible) = changed {
            trace!("visible nodes changed ({} rows)", visible.len());
            self.inner.visible.next(visible);
        }
        result
    }

    // ----- reading -----

    /// Id of the root branch
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Borrow a node
    ///
    /// The returned guard blocks mutating operations on this tree until it is
    /// dropped.
    pub fn get(&self, id: NodeId) -> Option<Ref<'_, Node<D>>> {
        Ref::filter_map(self.inner.state.borrow(), |state| state.registry.get(id)).ok()
    }

    /// Borrow the whole registry for navigation with [`Tree`] and
    /// [`TreeTraversal`](crate::TreeTraversal)
    pub fn read(&self) -> Ref<'_, Registry<D>> {
        Ref::map(self.inner.state.borrow(), |state| &state.registry)
    }

    /// The rows to render, in order
    ///
    /// Empty until the root has been loaded.
    pub fn visible_nodes(&self) -> Ref<'_, [NodeId]> {
        Ref::map(self.inner.state.borrow(), |state| state.views.root_view())
    }

    /// Standalone sequence of a branch, if it has one
    ///
    /// Collapsed and buried branches keep their flattened subtree here.
    pub fn flat_view(&self, id: NodeId) -> Option<Ref<'_, [NodeId]>> {
        Ref::filter_map(self.inner.state.borrow(), |state| state.views.get(id)).ok()
    }

    /// Number of hops from the root, `None` for unknown ids
    pub fn depth(&self, id: NodeId) -> Option<usize> {
        let state = self.inner.state.borrow();
        state
            .registry
            .contains(id)
            .then(|| state.registry.depth(id))
    }

    /// Parent of a node, `None` for the root and unknown ids
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.inner.state.borrow().registry.parent_of(id)
    }

    /// Loaded children of a branch
    pub fn children(&self, id: NodeId) -> Option<Vec<NodeId>> {
        let state = self.inner.state.borrow();
        state.registry.get(id)?.children().map(<[NodeId]>::to_vec)
    }

    /// Number of registered nodes, root included
    pub fn node_count(&self) -> usize {
        self.inner.state.borrow().registry.len()
    }

    /// Whether a branch's children have been loaded
    pub fn is_loaded(&self, id: NodeId) -> bool {
        self.get(id).map(|node| node.is_loaded()).unwrap_or(false)
    }

    /// The optimistic expansion flag, set as soon as an expand is requested
    pub fn intends_expanded(&self, id: NodeId) -> bool {
        self.get(id).map(|node| node.intends_expanded()).unwrap_or(false)
    }

    /// Whether a branch is loaded, meant to be expanded, and inlined into its
    /// holder's sequence
    ///
    /// The root is never inlined; it counts as expanded once loaded.
    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.inner.state.borrow().is_expanded(id)
    }

    /// Whether no ancestor of the node is holding it in a collapsed sequence
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.inner.state.borrow().is_visible(id)
    }

    // ----- notifications -----

    /// Set the callback invoked whenever the visible nodes change
    ///
    /// Replaces any callback set before. The first commit of the root's
    /// children is not reported.
    pub fn on_visible_nodes_change(&self, callback: impl Fn(&[NodeId]) + 'static) {
        if let Some(previous) = self.inner.visible_slot.take() {
            self.inner.visible.unsubscribe(previous);
        }
        let id = self.subscribe_visible_nodes(callback);
        self.inner.visible_slot.set(Some(id));
    }

    /// Add an observer of the visible nodes alongside any others
    pub fn subscribe_visible_nodes(&self, callback: impl Fn(&[NodeId]) + 'static) -> SubscriptionId {
        self.inner
            .visible
            .subscribe(move |visible: &Vec<NodeId>| callback(visible))
    }

    /// Remove an observer added with [`subscribe_visible_nodes`](Self::subscribe_visible_nodes)
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.visible.unsubscribe(id)
    }

    // ----- loading -----

    /// Make sure a branch's children are loaded
    ///
    /// Resolves immediately for loaded branches. Concurrent calls for the
    /// same branch share a single request to the data source.
    pub fn ensure_loaded(&self, id: NodeId) -> LocalBoxFuture<'static, Result<()>> {
        self.load(id, LoadMode::Initial)
    }

    /// Ask the data source for a branch's children again and commit the result
    ///
    /// Children missing from the new list are unregistered along with their
    /// subtrees.
    pub fn reload(&self, id: NodeId) -> LocalBoxFuture<'static, Result<()>> {
        self.load(id, LoadMode::Reload)
    }

    fn load(&self, id: NodeId, mode: LoadMode) -> LocalBoxFuture<'static, Result<()>> {
        let started = self.start_load(id, mode);
        async move {
            match started? {
                Some(load) => load.await,
                None => Ok(()),
            }
        }
        .boxed_local()
    }

    /// Join the in-flight load for `id` or start a new one
    fn start_load(&self, id: NodeId, mode: LoadMode) -> Result<Option<SharedLoad>> {
        let request = {
            let state = self.inner.state.borrow();
            let node = state.registry.node(id)?;
            if !node.is_branch() {
                return Err(TreeError::NotABranch(id));
            }
            if mode == LoadMode::Initial && node.is_loaded() {
                return Ok(None);
            }
            if let Some(pending) = state.pending.get(&id) {
                debug!("joining in-flight load of {}", id);
                return Ok(Some(pending.clone()));
            }
            debug!("loading children of {} ({:?})", id, mode);
            self.inner.source.load(node, state.registry.factory(id))
        };

        let weak = Rc::downgrade(&self.inner);
        let load = async move {
            let result = request.await;
            let Some(inner) = weak.upgrade() else {
                return Ok(());
            };
            let tree = FlatTree { inner };
            tree.settle_load(id, mode, result).await
        }
        .boxed_local()
        .shared();

        self.inner
            .state
            .borrow_mut()
            .pending
            .insert(id, load.clone());
        Ok(Some(load))
    }

    async fn settle_load(
        &self,
        id: NodeId,
        mode: LoadMode,
        result: anyhow::Result<Vec<Node<D>>>,
    ) -> Result<()> {
        let expand = self.with_state(|state| {
            state.pending.remove(&id);
            let nodes = result.map_err(|source| TreeError::Load {
                branch: id,
                source: Rc::new(source),
            })?;
            debug!("loaded {} children of {}", nodes.len(), id);
            state.commit_load(id, mode, nodes)
        })?;

        if !expand.is_empty() {
            let expansions = expand
                .iter()
                .map(|&child| self.expand(child, ExpandOptions::default()));
            for (child, result) in expand.iter().zip(future::join_all(expansions).await) {
                if let Err(err) = result {
                    warn!("failed to expand {} after loading {}: {}", child, id, err);
                }
            }
        }
        Ok(())
    }

    // ----- expansion -----

    /// Expand a branch, loading its children first if needed
    ///
    /// The expansion flag is set before loading starts. If the branch is
    /// collapsed while its children are loading, the expand gives up once
    /// they arrive and the children stay cached behind the collapsed row.
    pub fn expand(&self, id: NodeId, options: ExpandOptions) -> LocalBoxFuture<'static, Result<()>> {
        let tree = self.clone();
        async move {
            {
                let state = tree.inner.state.borrow();
                state.registry.branch(id)?;
                if !options.recursive
                    && state.is_expanded(id)
                    && (!options.ensure_visible || state.is_visible(id))
                {
                    return Ok(());
                }
            }

            tree.with_state(|state| -> Result<()> {
                state.registry.branch_mut(id)?.expanded = true;
                Ok(())
            })?;
            tree.ensure_loaded(id).await?;

            let connected = tree.with_state(|state| -> Result<bool> {
                if !state.registry.get(id).map_or(false, Node::intends_expanded) {
                    return Ok(false);
                }
                state.connect(id, options.ensure_visible)?;
                Ok(true)
            })?;
            if !connected {
                debug!("expand of {} abandoned: collapsed while loading", id);
                return Ok(());
            }

            if options.recursive {
                let branches: Vec<NodeId> = {
                    let registry = tree.read();
                    registry
                        .children(id)
                        .filter(|&child| registry.is_branch(child))
                        .collect()
                };
                let expansions = branches.into_iter().map(|child| tree.expand(child, options));
                future::join_all(expansions)
                    .await
                    .into_iter()
                    .collect::<Result<Vec<()>>>()?;
            }
            Ok(())
        }
        .boxed_local()
    }

    /// Collapse a branch
    ///
    /// Loaded children are kept in the branch's own sequence so a later
    /// expand shows them again without loading. Collapsing an already
    /// collapsed branch only clears the flag. Collapsing the root does nothing.
    pub fn collapse(&self, id: NodeId) -> Result<()> {
        self.with_state(|state| {
            state.registry.branch(id)?;
            if id == NodeId::ROOT {
                return Ok(());
            }
            state.disconnect(id)?;
            state.registry.branch_mut(id)?.expanded = false;
            Ok(())
        })
    }

    // ----- structure -----

    /// Remove a node and its whole subtree
    pub fn remove(&self, id: NodeId) -> Result<()> {
        let removed = self.with_state(|state| state.remove(id))?;
        debug!("removed {} ({} nodes)", id, removed);
        Ok(())
    }

    /// Move a node to the end of another branch's children
    ///
    /// Loads the target first. If the node was moved or removed while the
    /// target was loading, nothing happens. Expanded branches stay expanded.
    pub fn move_node(&self, id: NodeId, to: NodeId) -> LocalBoxFuture<'static, Result<()>> {
        let tree = self.clone();
        async move {
            let origin = {
                let state = tree.inner.state.borrow();
                let origin = state
                    .registry
                    .node(id)?
                    .parent()
                    .ok_or(TreeError::RootOperation)?;
                state.registry.branch(to)?;
                if origin == to {
                    return Ok(());
                }
                if to == id || state.registry.is_ancestor_of(id, to) {
                    return Err(TreeError::InvalidMove { node: id, target: to });
                }
                origin
            };

            tree.ensure_loaded(to).await?;

            tree.with_state(|state| {
                if state.registry.parent_of(id) != Some(origin) {
                    debug!("move of {} abandoned: it moved while {} was loading", id, to);
                    return Ok(());
                }
                if state.registry.is_ancestor_of(id, to) {
                    return Err(TreeError::InvalidMove { node: id, target: to });
                }
                state.move_node(id, to)?;
                debug!("moved {} from {} to {}", id, origin, to);
                Ok(())
            })
        }
        .boxed_local()
    }

    /// Edit a branch's children in a transaction
    ///
    /// `edit` receives a [`Draft`] of the current children (empty for an
    /// unloaded branch) and may return a replacement list. The result is
    /// committed only if the draft ends up modified; returns whether it was.
    /// Children dropped by the transaction are removed with their subtrees.
    ///
    /// The tree is borrowed while `edit` runs, so it must not call mutating
    /// operations on this tree.
    pub fn produce<F, R>(&self, id: NodeId, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut Draft<'_, D>) -> R,
        R: IntoReplacement,
    {
        let (children, created) = {
            let state = self.inner.state.borrow();
            let original = state
                .registry
                .node(id)?
                .children()
                .map(<[NodeId]>::to_vec)
                .unwrap_or_default();
            state.registry.branch(id)?;

            let mut draft = Draft::new(&state.registry, state.registry.factory(id), original);
            if let Some(replacement) = edit(&mut draft).into_replacement() {
                draft.replace(replacement);
            }
            if !draft.is_modified() {
                return Ok(false);
            }
            draft.finish()
        };

        self.with_state(|state| state.commit_children(id, created, children))?;
        trace!("committed transaction on {}", id);
        Ok(true)
    }
}

impl<D: fmt::Debug + 'static> fmt::Debug for FlatTree<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("FlatTree")
            .field("nodes", &state.registry.len())
            .field("visible", &state.views.root_view())
            .field("pending", &state.pending.len())
            .finish()
    }
}
