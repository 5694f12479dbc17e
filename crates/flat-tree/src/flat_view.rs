//! Standalone flattened projections keyed by branch id
//!
//! A branch is present here when its subtree is *not* inlined into an
//! ancestor's sequence: the root (always), collapsed branches, and expanded
//! branches whose children have just been loaded but not yet connected.
//! Branches that are inlined have no key; their visible descendants live in
//! the sequence of the nearest ancestor that does have one.

use std::collections::HashMap;

use crate::node::NodeId;
use crate::splice::{splice, Spliced};

#[derive(Debug)]
pub(crate) struct FlatViews {
    root: NodeId,
    entries: HashMap<NodeId, Vec<NodeId>>,
    /// Root sequence as it was before the first write since the last
    /// [`take_root_change`](Self::take_root_change)
    root_before: Option<Vec<NodeId>>,
    /// The first root sequence stored after construction is not reported
    bootstrapped: bool,
}

impl FlatViews {
    pub(crate) fn new(root: NodeId) -> Self {
        let mut entries = HashMap::new();
        entries.insert(root, Vec::new());
        Self {
            root,
            entries,
            root_before: None,
            bootstrapped: false,
        }
    }

    /// The root's sequence, i.e. the visible rows
    pub(crate) fn root_view(&self) -> &[NodeId] {
        self.get(self.root).unwrap_or(&[])
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&[NodeId]> {
        self.entries.get(&id).map(Vec::as_slice)
    }

    /// Returns true if the branch currently has a standalone sequence
    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    pub(crate) fn set(&mut self, id: NodeId, sequence: Vec<NodeId>) {
        if id == self.root {
            if self.bootstrapped {
                self.snapshot_root();
            } else {
                self.bootstrapped = true;
            }
        }
        self.entries.insert(id, sequence);
    }

    /// Replace a range of `owner`'s sequence, returning what was cut out
    ///
    /// Does nothing and returns `None` if `owner` has no entry.
    pub(crate) fn splice(
        &mut self,
        owner: NodeId,
        start: usize,
        delete_count: usize,
        items: &[NodeId],
    ) -> Option<Vec<NodeId>> {
        let current = self.entries.get(&owner)?;
        let Spliced { sequence, removed } = splice(current, start, delete_count, items);
        if owner == self.root {
            self.snapshot_root();
        }
        self.entries.insert(owner, sequence);
        Some(removed)
    }

    /// Drop a branch's standalone entry. The root's entry is never dropped.
    pub(crate) fn remove(&mut self, id: NodeId) -> Option<Vec<NodeId>> {
        if id == self.root {
            return None;
        }
        self.entries.remove(&id)
    }

    fn snapshot_root(&mut self) {
        if self.root_before.is_none() {
            self.root_before = Some(self.root_view().to_vec());
        }
    }

    /// Whether the root sequence differs from what it was before the writes
    /// made since the previous call
    pub(crate) fn take_root_change(&mut self) -> bool {
        match self.root_before.take() {
            Some(before) => before.as_slice() != self.root_view(),
            None => false,
        }
    }
}
