//! Immutable cache snapshot.

use std::collections::{HashMap, HashSet};

use rankwarden_core::{Group, GroupId, Principal, PrincipalId};

/// A group as cached for resolution: the record itself plus its permission
/// set flattened into plain lowercase strings for O(1) probes.
#[derive(Debug, Clone)]
pub struct CachedGroup {
    pub group: Group,
    pub permissions: HashSet<String>,
}

impl CachedGroup {
    pub fn from_group(group: Group) -> Self {
        let permissions = group
            .permissions
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();
        Self { group, permissions }
    }
}

/// One consistent view of the world: every group's resolved permission set
/// and every active principal's current group.
///
/// Snapshots are immutable once published. "Updating" the cache means
/// deriving a complete replacement and swapping the pointer, so readers
/// always observe a snapshot in its entirety, never a mix.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    groups: HashMap<GroupId, CachedGroup>,
    principals: HashMap<PrincipalId, GroupId>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from freshly fetched store state.
    pub fn from_store_state(groups: Vec<Group>, principals: Vec<Principal>) -> Self {
        let groups: HashMap<GroupId, CachedGroup> = groups
            .into_iter()
            .map(|g| (g.id, CachedGroup::from_group(g)))
            .collect();
        let principals = principals
            .into_iter()
            .map(|p| (p.id, p.group_id))
            .collect();
        Self { groups, principals }
    }

    /// Derive a snapshot with one principal's membership replaced, inserting
    /// the group's permission set if the group is new to the cache.
    pub fn with_principal(&self, principal_id: PrincipalId, group: &Group) -> Self {
        let mut next = self.clone();
        next.groups
            .entry(group.id)
            .or_insert_with(|| CachedGroup::from_group(group.clone()));
        next.principals.insert(principal_id, group.id);
        next
    }

    pub fn group(&self, id: GroupId) -> Option<&CachedGroup> {
        self.groups.get(&id)
    }

    pub fn principal_group(&self, id: PrincipalId) -> Option<GroupId> {
        self.principals.get(&id).copied()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn principal_count(&self) -> usize {
        self.principals.len()
    }
}
