//! The "store changed" signal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rankwarden_core::{GroupId, PrincipalId};

/// What kind of record changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    GroupCreated,
    GroupUpdated,
    GroupDeleted,
    PermissionAttached,
    PermissionDetached,
    MembershipUpdated,
    /// Connection-path principal sync (first contact, display-name refresh).
    /// The session layer applies a narrow cache update for these, so they are
    /// excluded from the full-rebuild invalidation policy.
    PrincipalSeen,
}

impl MutationKind {
    /// Whether this mutation invalidates the authorization cache.
    pub fn invalidates_cache(&self) -> bool {
        !matches!(self, Self::PrincipalSeen)
    }
}

/// Published by the store after every successful create/update/delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMutation {
    pub kind: MutationKind,
    pub group_id: Option<GroupId>,
    pub principal_id: Option<PrincipalId>,
    pub occurred_at: DateTime<Utc>,
}

impl StoreMutation {
    pub fn group(kind: MutationKind, group_id: GroupId, occurred_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            group_id: Some(group_id),
            principal_id: None,
            occurred_at,
        }
    }

    pub fn principal(
        kind: MutationKind,
        principal_id: PrincipalId,
        group_id: GroupId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            group_id: Some(group_id),
            principal_id: Some(principal_id),
            occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_seen_does_not_invalidate() {
        assert!(!MutationKind::PrincipalSeen.invalidates_cache());
        assert!(MutationKind::GroupDeleted.invalidates_cache());
        assert!(MutationKind::MembershipUpdated.invalidates_cache());
    }
}
