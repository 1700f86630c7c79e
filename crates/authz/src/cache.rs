//! Process-wide authorization cache.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use tracing::info;

use rankwarden_core::{Group, GroupId, PermissionString, PrincipalId};
use rankwarden_store::{PermissionStore, StoreError};

use crate::snapshot::Snapshot;

/// Holder of the current [`Snapshot`].
///
/// Readers clone the inner `Arc` under a momentary read lock and then work
/// entirely lock-free on the immutable snapshot; writers derive a complete
/// replacement and swap the pointer. There is no in-place mutation, so the
/// hot path never contends with a rebuild in progress.
#[derive(Debug)]
pub struct AuthorizationCache {
    snapshot: RwLock<Arc<Snapshot>>,
}

impl AuthorizationCache {
    /// Start empty; every lookup denies until the first rebuild.
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().unwrap().clone()
    }

    /// Re-derive the snapshot wholesale from the store and swap it in.
    ///
    /// If either fetch fails the previous snapshot stays in effect:
    /// stale-but-consistent beats serving an empty cache. The error is
    /// returned for the caller to log; nothing partial is ever published.
    pub fn rebuild(&self, store: &dyn PermissionStore) -> Result<(), StoreError> {
        let groups = store.fetch_all_groups()?;
        let principals = store.fetch_active_principals()?;

        let next = Arc::new(Snapshot::from_store_state(groups, principals));
        let (group_count, principal_count) = (next.group_count(), next.principal_count());
        *self.snapshot.write().unwrap() = next;

        info!(groups = group_count, principals = principal_count, "authorization cache rebuilt");
        Ok(())
    }

    /// Narrow update for a single principal's membership.
    ///
    /// Used on connect/reconnect, where a full rebuild per event would be
    /// wasteful. If `group` is new to the cache its permission set is taken
    /// from the record passed in.
    pub fn cache_single(&self, principal_id: PrincipalId, group: &Group) {
        let mut guard = self.snapshot.write().unwrap();
        let next = guard.with_principal(principal_id, group);
        *guard = Arc::new(next);
    }

    /// The resolved permission set of a cached group.
    pub fn resolved_permissions(&self, group_id: GroupId) -> Option<BTreeSet<PermissionString>> {
        self.snapshot()
            .group(group_id)
            .map(|cached| cached.group.permissions.clone())
    }

    /// The current group of an active principal.
    pub fn current_group(&self, principal_id: PrincipalId) -> Option<Group> {
        let snapshot = self.snapshot();
        let group_id = snapshot.principal_group(principal_id)?;
        snapshot.group(group_id).map(|cached| cached.group.clone())
    }
}

impl Default for AuthorizationCache {
    fn default() -> Self {
        Self::new()
    }
}
