//! Permission store abstraction.

use rankwarden_core::{
    DomainError, Group, GroupId, GroupName, GroupPrefix, GroupPriority, MembershipExpiry,
    PermissionString, Principal, PrincipalId,
};

/// Store operation error.
///
/// `Unavailable` is the transient-backend case: callers that maintain caches
/// keep their previous state and log a warning rather than propagate it into
/// the read path.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("group not found: {0}")]
    GroupNotFound(GroupId),

    #[error("principal not found: {0}")]
    PrincipalNotFound(PrincipalId),

    #[error("group name already taken: {0}")]
    NameTaken(GroupName),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Partial update of a group's attributes.
///
/// `None` fields are left untouched. Renaming the default group is rejected
/// by every implementation.
#[derive(Debug, Clone, Default)]
pub struct GroupUpdate {
    pub name: Option<GroupName>,
    pub priority: Option<GroupPriority>,
    pub prefix: Option<GroupPrefix>,
}

impl GroupUpdate {
    pub fn rename(name: GroupName) -> Self {
        Self {
            name: Some(name),
            ..Self::default()
        }
    }

    pub fn priority(priority: GroupPriority) -> Self {
        Self {
            priority: Some(priority),
            ..Self::default()
        }
    }

    pub fn prefix(prefix: GroupPrefix) -> Self {
        Self {
            prefix: Some(prefix),
            ..Self::default()
        }
    }
}

/// Durable record of groups, permissions, and principal memberships.
///
/// Synchronous from the caller's perspective; implementations decide their
/// own durability and transaction boundaries but must guarantee that a call
/// returning `Ok` means the mutation is visible to the next fetch, and must
/// serialize writes per logical resource. After every successful mutation the
/// implementation publishes a [`rankwarden_events::StoreMutation`] so cache
/// invalidation can run.
pub trait PermissionStore: Send + Sync {
    /// All groups, each with its flattened permission set.
    fn fetch_all_groups(&self) -> Result<Vec<Group>, StoreError>;

    fn fetch_group(&self, name: &GroupName) -> Result<Option<Group>, StoreError>;

    fn fetch_group_by_id(&self, id: GroupId) -> Result<Option<Group>, StoreError>;

    fn fetch_principal(&self, id: PrincipalId) -> Result<Option<Principal>, StoreError>;

    /// Records of all currently active principals, in one query.
    fn fetch_active_principals(&self) -> Result<Vec<Principal>, StoreError>;

    fn create_group(&self, name: GroupName) -> Result<Group, StoreError>;

    fn update_group(&self, id: GroupId, update: GroupUpdate) -> Result<Group, StoreError>;

    /// Delete a group.
    ///
    /// Atomically reassigns all member principals to the default group (with
    /// permanent membership), detaches all permission associations, and only
    /// then removes the group record. The default group cannot be deleted.
    fn delete_group(&self, id: GroupId) -> Result<(), StoreError>;

    /// Associate a permission with a group. Idempotent.
    fn attach_permission(
        &self,
        group_id: GroupId,
        permission: PermissionString,
    ) -> Result<(), StoreError>;

    /// Remove a permission association from a group. Idempotent.
    fn detach_permission(
        &self,
        group_id: GroupId,
        permission: &PermissionString,
    ) -> Result<(), StoreError>;

    /// Connection-path record sync: create the principal in the default group
    /// on first contact, refresh the display name, and repair a dangling
    /// group reference. Publishes `PrincipalSeen` (excluded from full-rebuild
    /// invalidation; the session layer applies a narrow cache update).
    fn upsert_principal(
        &self,
        id: PrincipalId,
        display_name: &str,
    ) -> Result<Principal, StoreError>;

    fn update_principal_membership(
        &self,
        id: PrincipalId,
        group_id: GroupId,
        expiry: MembershipExpiry,
    ) -> Result<Principal, StoreError>;

    /// Create the distinguished default group if absent and return it.
    fn ensure_default_group(&self) -> Result<Group, StoreError>;
}
