//! Projection algebra: keeping flat views in step with the child lists
//!
//! Every visible row lives in exactly one sequence: the standalone entry of
//! the nearest ancestor that has one (its *holder*). Connecting a branch
//! splices its entry into its holder right after the branch's own row;
//! disconnecting cuts the branch's descendants back out into its own entry.
//! Everything here is synchronous and only touches the part of the
//! projection that belongs to the branch being changed.

use log::{debug, trace};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::ops::Range;

use crate::error::{Result, TreeError};
use crate::flat_view::FlatViews;
use crate::node::{Node, NodeId};
use crate::registry::Registry;
use crate::tree::{LoadMode, SharedLoad};

pub(crate) struct TreeState<D> {
    pub(crate) registry: Registry<D>,
    pub(crate) views: FlatViews,
    /// In-flight loads, at most one per branch
    pub(crate) pending: HashMap<NodeId, SharedLoad>,
}

impl<D> TreeState<D> {
    pub(crate) fn new(root_data: D) -> Self {
        Self {
            registry: Registry::new(root_data),
            views: FlatViews::new(NodeId::ROOT),
            pending: HashMap::new(),
        }
    }

    /// Nearest strict ancestor that owns a standalone sequence
    ///
    /// `None` only for the root (the root always has an entry, so every other
    /// registered node has a holder).
    pub(crate) fn holder(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.registry.parent_of(id);
        while let Some(ancestor) = current {
            if self.views.contains(ancestor) {
                return Some(ancestor);
            }
            current = self.registry.parent_of(ancestor);
        }
        None
    }

    /// A loaded branch whose descendants are inlined into its holder
    fn is_inlined(&self, id: NodeId) -> bool {
        id != NodeId::ROOT
            && !self.views.contains(id)
            && self.registry.get(id).map(Node::is_loaded).unwrap_or(false)
    }

    pub(crate) fn is_expanded(&self, id: NodeId) -> bool {
        let Ok(branch) = self.registry.branch(id) else {
            return false;
        };
        if branch.children.is_none() || !branch.expanded {
            return false;
        }
        id == NodeId::ROOT || !self.views.contains(id)
    }

    pub(crate) fn is_visible(&self, id: NodeId) -> bool {
        if !self.registry.contains(id) {
            return false;
        }
        let mut current = self.registry.parent_of(id);
        while let Some(ancestor) = current {
            if ancestor != NodeId::ROOT && self.views.contains(ancestor) {
                return false;
            }
            current = self.registry.parent_of(ancestor);
        }
        true
    }

    fn position_in(&self, holder: NodeId, id: NodeId) -> Result<usize> {
        self.views
            .get(holder)
            .and_then(|sequence| sequence.iter().position(|&x| x == id))
            .ok_or(TreeError::DetachedNode { node: id, holder })
    }

    /// Positions in `holder`'s sequence taken by `id` and its inlined descendants
    ///
    /// The range ends where the next sibling of `id`, or of the first ancestor
    /// below `holder` that has one, begins. Without such a sibling it runs to
    /// the end of the sequence.
    fn occupied_range(&self, id: NodeId, holder: NodeId) -> Result<Range<usize>> {
        let start = self.position_in(holder, id)?;
        let sequence = self.views.get(holder).unwrap_or(&[]);

        let mut current = id;
        while current != holder {
            let Some(parent) = self.registry.parent_of(current) else {
                break;
            };
            let siblings = self
                .registry
                .get(parent)
                .and_then(Node::children)
                .unwrap_or(&[]);
            let next = siblings
                .iter()
                .position(|&s| s == current)
                .and_then(|i| siblings.get(i + 1));
            if let Some(&next) = next {
                let end = sequence[start + 1..]
                    .iter()
                    .position(|&x| x == next)
                    .map_or(sequence.len(), |offset| start + 1 + offset);
                return Ok(start..end);
            }
            current = parent;
        }
        Ok(start..sequence.len())
    }

    /// Pull a branch's inlined descendants out of its holder into its own entry
    ///
    /// Leaves the branch's own row in place. No-op for the root, for unloaded
    /// branches and for branches that already have an entry. Returns whether
    /// anything moved.
    pub(crate) fn disconnect(&mut self, id: NodeId) -> Result<bool> {
        self.registry.branch(id)?;
        if !self.is_inlined(id) {
            return Ok(false);
        }
        let holder = self.holder(id).ok_or(TreeError::UnknownNode(id))?;
        let range = self.occupied_range(id, holder)?;
        let descendants = self
            .views
            .splice(holder, range.start + 1, range.len() - 1, &[])
            .unwrap_or_default();
        trace!(
            "disconnected {} from {} ({} rows)",
            id,
            holder,
            descendants.len()
        );
        self.views.set(id, descendants);
        self.registry.branch_mut(id)?.expanded = false;
        Ok(true)
    }

    /// Splice a branch's entry into its holder right after the branch's row
    ///
    /// With `lift_to_root`, keeps connecting holders until the branch is
    /// inlined all the way up to the root.
    pub(crate) fn connect(&mut self, id: NodeId, lift_to_root: bool) -> Result<()> {
        let mut current = id;
        while current != NodeId::ROOT {
            self.registry.branch(current)?;
            let holder = self.holder(current).ok_or(TreeError::UnknownNode(current))?;
            if self.views.contains(current) {
                let position = self.position_in(holder, current)?;
                let sequence = self.views.remove(current).unwrap_or_default();
                trace!(
                    "connected {} into {} ({} rows)",
                    current,
                    holder,
                    sequence.len()
                );
                self.views.splice(holder, position + 1, 0, &sequence);
            }
            self.registry.branch_mut(current)?.expanded = true;
            if !lift_to_root {
                break;
            }
            current = holder;
        }
        Ok(())
    }

    /// Replace a branch's child list and rebuild its projection
    ///
    /// Expanded subtrees that survive the change are pulled out first and
    /// reconnected afterwards, innermost first, so nested expansion is kept.
    pub(crate) fn set_nodes(&mut self, branch: NodeId, children: Vec<NodeId>) -> Result<()> {
        let previous = self.registry.branch(branch)?.children.clone();
        let mut restore: SmallVec<[NodeId; 8]> = SmallVec::new();

        if let Some(previous) = previous {
            let surviving: HashSet<NodeId> = children.iter().copied().collect();
            for child in previous {
                if self.is_inlined(child) {
                    self.disconnect(child)?;
                    if surviving.contains(&child) {
                        restore.push(child);
                    }
                }
            }
            if self.is_inlined(branch) {
                self.disconnect(branch)?;
                restore.push(branch);
            }
        }

        self.registry.branch_mut(branch)?.children = Some(children.clone());
        self.views.set(branch, children);

        for id in restore {
            self.connect(id, false)?;
        }
        Ok(())
    }

    /// Register `created` and make `children` the branch's child list
    ///
    /// Every id in `children` must be a freshly created node for this branch
    /// or one of its current children. Previous children that are not kept
    /// are unregistered together with their subtrees.
    pub(crate) fn commit_children(
        &mut self,
        branch: NodeId,
        created: Vec<Node<D>>,
        children: Vec<NodeId>,
    ) -> Result<()> {
        let previous = self.registry.branch(branch)?.children.clone().unwrap_or_default();
        let existing: HashSet<NodeId> = previous.iter().copied().collect();
        let mut fresh: HashMap<NodeId, Node<D>> = HashMap::with_capacity(created.len());
        for node in created {
            if node.parent() != Some(branch) || !self.registry.accepts(&node) {
                return Err(TreeError::ForeignNode {
                    node: node.id(),
                    branch,
                });
            }
            fresh.insert(node.id(), node);
        }

        let mut seen = HashSet::with_capacity(children.len());
        for &id in &children {
            if !seen.insert(id) {
                return Err(TreeError::DuplicateChild { node: id, branch });
            }
            if !existing.contains(&id) && !fresh.contains_key(&id) {
                return Err(TreeError::ForeignNode { node: id, branch });
            }
        }

        for id in &children {
            if let Some(node) = fresh.remove(id) {
                self.registry.insert(node)?;
            }
        }
        self.set_nodes(branch, children)?;

        for id in previous {
            if !seen.contains(&id) {
                self.unregister_subtree(id);
            }
        }
        Ok(())
    }

    /// Commit the children a data source produced for `branch`
    ///
    /// Returns the ids of the new child branches that were created expanded
    /// and still need their own expansion. A first load that lost the race
    /// against another commit, or whose branch was removed meanwhile, is
    /// dropped.
    pub(crate) fn commit_load(
        &mut self,
        branch: NodeId,
        mode: LoadMode,
        nodes: Vec<Node<D>>,
    ) -> Result<Vec<NodeId>> {
        let Some(node) = self.registry.get(branch) else {
            debug!("discarding load of {}: no longer registered", branch);
            return Ok(Vec::new());
        };
        if mode == LoadMode::Initial && node.is_loaded() {
            debug!("discarding load of {}: children were committed meanwhile", branch);
            return Ok(Vec::new());
        }
        let expand = nodes
            .iter()
            .filter(|n| n.is_branch() && n.intends_expanded())
            .map(Node::id)
            .collect();
        let order = nodes.iter().map(Node::id).collect();
        self.commit_children(branch, nodes, order)?;
        Ok(expand)
    }

    /// Forget a node and all its descendants
    ///
    /// Uses an explicit stack so deep trees do not grow the call stack.
    /// Returns the number of nodes unregistered.
    pub(crate) fn unregister_subtree(&mut self, id: NodeId) -> usize {
        let mut stack = vec![id];
        let mut count = 0;
        while let Some(current) = stack.pop() {
            if let Some(node) = self.registry.remove(current) {
                if let Some(children) = node.children() {
                    stack.extend_from_slice(children);
                }
                count += 1;
            }
            self.views.remove(current);
            self.pending.remove(&current);
        }
        count
    }

    /// Remove a node, its subtree, its rows in the projection, and its slot
    /// in the parent's child list
    pub(crate) fn remove(&mut self, id: NodeId) -> Result<usize> {
        if id == NodeId::ROOT {
            return Err(TreeError::RootOperation);
        }
        let parent = self
            .registry
            .node(id)?
            .parent()
            .ok_or(TreeError::RootOperation)?;

        if let Some(holder) = self.holder(id) {
            let range = self.occupied_range(id, holder)?;
            self.views.splice(holder, range.start, range.len(), &[]);
        }

        let removed = self.unregister_subtree(id);
        if let Some(children) = self.registry.branch_mut(parent)?.children.as_mut() {
            if let Some(index) = children.iter().position(|&c| c == id) {
                children.remove(index);
            }
        }
        Ok(removed)
    }

    /// Reparent `id` under the loaded branch `to`, appending it to `to`'s children
    pub(crate) fn move_node(&mut self, id: NodeId, to: NodeId) -> Result<()> {
        let origin = self
            .registry
            .node(id)?
            .parent()
            .ok_or(TreeError::RootOperation)?;
        self.registry.branch(to)?;

        let reconnect = self.is_inlined(id);
        if reconnect {
            self.disconnect(id)?;
        }

        let mut remaining = self.registry.branch(origin)?.children.clone().unwrap_or_default();
        remaining.retain(|&c| c != id);
        self.set_nodes(origin, remaining)?;

        let mut destination = self.registry.branch(to)?.children.clone().unwrap_or_default();
        destination.push(id);
        self.registry.node_mut(id)?.set_parent(to);
        self.set_nodes(to, destination)?;

        if reconnect {
            self.connect(id, false)?;
        }
        Ok(())
    }
}
