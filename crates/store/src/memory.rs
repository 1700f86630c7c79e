//! In-memory permission store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use tracing::{debug, info, warn};

use rankwarden_core::{
    DomainError, Group, GroupId, GroupName, MembershipExpiry, PermissionString, Principal,
    PrincipalId, SessionRegistry,
};
use rankwarden_events::{EventBus, MutationKind, StoreMutation};

use crate::store::{GroupUpdate, PermissionStore, StoreError};

/// In-memory permission store.
///
/// The reference implementation of the store boundary: RwLock-guarded maps
/// for the records, a store-wide write mutex so each mutation (including its
/// change notification) completes before the next begins, and a
/// [`StoreMutation`] published on the bus after every successful write.
/// "Active" principals are the ones the session registry currently knows.
#[derive(Debug)]
pub struct InMemoryPermissionStore<B> {
    groups: RwLock<HashMap<GroupId, Group>>,
    principals: RwLock<HashMap<PrincipalId, Principal>>,
    registry: Arc<SessionRegistry>,
    bus: B,
    write_lock: Mutex<()>,
}

impl<B> InMemoryPermissionStore<B>
where
    B: EventBus<StoreMutation>,
{
    pub fn new(registry: Arc<SessionRegistry>, bus: B) -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            principals: RwLock::new(HashMap::new()),
            registry,
            bus,
            write_lock: Mutex::new(()),
        }
    }

    /// The mutation itself is already committed; a bus failure only delays
    /// invalidation until the next scheduled rebuild, so it is logged rather
    /// than surfaced.
    fn publish(&self, mutation: StoreMutation) {
        if let Err(e) = self.bus.publish(mutation) {
            warn!(error = ?e, "failed to publish store mutation");
        }
    }

    fn default_group_id(&self) -> Result<GroupId, StoreError> {
        let groups = self.groups.read().unwrap();
        groups
            .values()
            .find(|g| g.is_default())
            .map(|g| g.id)
            .ok_or_else(|| DomainError::invariant("default group missing").into())
    }
}

impl<B> PermissionStore for InMemoryPermissionStore<B>
where
    B: EventBus<StoreMutation> + Send + Sync,
{
    fn fetch_all_groups(&self) -> Result<Vec<Group>, StoreError> {
        Ok(self.groups.read().unwrap().values().cloned().collect())
    }

    fn fetch_group(&self, name: &GroupName) -> Result<Option<Group>, StoreError> {
        let groups = self.groups.read().unwrap();
        Ok(groups.values().find(|g| &g.name == name).cloned())
    }

    fn fetch_group_by_id(&self, id: GroupId) -> Result<Option<Group>, StoreError> {
        Ok(self.groups.read().unwrap().get(&id).cloned())
    }

    fn fetch_principal(&self, id: PrincipalId) -> Result<Option<Principal>, StoreError> {
        Ok(self.principals.read().unwrap().get(&id).cloned())
    }

    fn fetch_active_principals(&self) -> Result<Vec<Principal>, StoreError> {
        let principals = self.principals.read().unwrap();
        Ok(self
            .registry
            .active_ids()
            .into_iter()
            .filter_map(|id| principals.get(&id).cloned())
            .collect())
    }

    fn create_group(&self, name: GroupName) -> Result<Group, StoreError> {
        let _write = self.write_lock.lock().unwrap();

        let group = {
            let mut groups = self.groups.write().unwrap();
            if groups.values().any(|g| g.name == name) {
                return Err(StoreError::NameTaken(name));
            }
            let group = Group::new(GroupId::new(), name);
            groups.insert(group.id, group.clone());
            group
        };

        info!(group = %group.name, "group created");
        self.publish(StoreMutation::group(
            MutationKind::GroupCreated,
            group.id,
            Utc::now(),
        ));
        Ok(group)
    }

    fn update_group(&self, id: GroupId, update: GroupUpdate) -> Result<Group, StoreError> {
        let _write = self.write_lock.lock().unwrap();

        let group = {
            let mut groups = self.groups.write().unwrap();
            if let Some(new_name) = &update.name {
                let current = groups.get(&id).ok_or(StoreError::GroupNotFound(id))?;
                if current.is_default() {
                    return Err(DomainError::invariant(
                        "the default group cannot be renamed",
                    )
                    .into());
                }
                if groups.values().any(|g| g.id != id && &g.name == new_name) {
                    return Err(StoreError::NameTaken(new_name.clone()));
                }
            }
            let group = groups.get_mut(&id).ok_or(StoreError::GroupNotFound(id))?;
            if let Some(name) = update.name {
                group.name = name;
            }
            if let Some(priority) = update.priority {
                group.priority = priority;
            }
            if let Some(prefix) = update.prefix {
                group.prefix = prefix;
            }
            group.clone()
        };

        debug!(group = %group.name, "group updated");
        self.publish(StoreMutation::group(
            MutationKind::GroupUpdated,
            group.id,
            Utc::now(),
        ));
        Ok(group)
    }

    fn delete_group(&self, id: GroupId) -> Result<(), StoreError> {
        let _write = self.write_lock.lock().unwrap();

        let default_id = self.default_group_id()?;
        let name = {
            let mut groups = self.groups.write().unwrap();
            let group = groups.get(&id).ok_or(StoreError::GroupNotFound(id))?;
            if group.is_default() {
                return Err(
                    DomainError::invariant("the default group cannot be deleted").into(),
                );
            }
            let name = group.name.clone();

            // Reassign members first, then detach permissions, then remove the
            // record: no principal may ever reference a deleted group.
            let mut principals = self.principals.write().unwrap();
            for principal in principals.values_mut() {
                if principal.group_id == id {
                    principal.group_id = default_id;
                    principal.expiry = MembershipExpiry::Permanent;
                }
            }
            groups.remove(&id);
            name
        };

        info!(group = %name, "group deleted, members reassigned to default");
        self.publish(StoreMutation::group(
            MutationKind::GroupDeleted,
            id,
            Utc::now(),
        ));
        Ok(())
    }

    fn attach_permission(
        &self,
        group_id: GroupId,
        permission: PermissionString,
    ) -> Result<(), StoreError> {
        let _write = self.write_lock.lock().unwrap();

        let changed = {
            let mut groups = self.groups.write().unwrap();
            let group = groups
                .get_mut(&group_id)
                .ok_or(StoreError::GroupNotFound(group_id))?;
            group.permissions.insert(permission)
        };

        if changed {
            self.publish(StoreMutation::group(
                MutationKind::PermissionAttached,
                group_id,
                Utc::now(),
            ));
        }
        Ok(())
    }

    fn detach_permission(
        &self,
        group_id: GroupId,
        permission: &PermissionString,
    ) -> Result<(), StoreError> {
        let _write = self.write_lock.lock().unwrap();

        let changed = {
            let mut groups = self.groups.write().unwrap();
            let group = groups
                .get_mut(&group_id)
                .ok_or(StoreError::GroupNotFound(group_id))?;
            group.permissions.remove(permission)
        };

        if changed {
            self.publish(StoreMutation::group(
                MutationKind::PermissionDetached,
                group_id,
                Utc::now(),
            ));
        }
        Ok(())
    }

    fn upsert_principal(
        &self,
        id: PrincipalId,
        display_name: &str,
    ) -> Result<Principal, StoreError> {
        let _write = self.write_lock.lock().unwrap();

        let default_id = self.default_group_id()?;
        let principal = {
            let groups = self.groups.read().unwrap();
            let mut principals = self.principals.write().unwrap();
            match principals.get_mut(&id) {
                Some(principal) => {
                    principal.name = display_name.to_string();
                    if !groups.contains_key(&principal.group_id) {
                        warn!(principal = %id, "dangling group reference, repairing to default");
                        principal.group_id = default_id;
                        principal.expiry = MembershipExpiry::Permanent;
                    }
                    principal.clone()
                }
                None => {
                    let principal = Principal::new(id, display_name, default_id);
                    principals.insert(id, principal.clone());
                    principal
                }
            }
        };

        self.publish(StoreMutation::principal(
            MutationKind::PrincipalSeen,
            id,
            principal.group_id,
            Utc::now(),
        ));
        Ok(principal)
    }

    fn update_principal_membership(
        &self,
        id: PrincipalId,
        group_id: GroupId,
        expiry: MembershipExpiry,
    ) -> Result<Principal, StoreError> {
        let _write = self.write_lock.lock().unwrap();

        let principal = {
            let groups = self.groups.read().unwrap();
            if !groups.contains_key(&group_id) {
                return Err(StoreError::GroupNotFound(group_id));
            }
            let mut principals = self.principals.write().unwrap();
            let principal = principals
                .get_mut(&id)
                .ok_or(StoreError::PrincipalNotFound(id))?;
            principal.group_id = group_id;
            principal.expiry = expiry;
            principal.clone()
        };

        debug!(principal = %id, group = %group_id, "membership updated");
        self.publish(StoreMutation::principal(
            MutationKind::MembershipUpdated,
            id,
            group_id,
            Utc::now(),
        ));
        Ok(principal)
    }

    fn ensure_default_group(&self) -> Result<Group, StoreError> {
        let _write = self.write_lock.lock().unwrap();

        let (group, created) = {
            let mut groups = self.groups.write().unwrap();
            match groups.values().find(|g| g.is_default()).cloned() {
                Some(group) => (group, false),
                None => {
                    let group = Group::new(GroupId::new(), GroupName::default_group());
                    groups.insert(group.id, group.clone());
                    (group, true)
                }
            }
        };

        if created {
            info!("initialized default group");
            self.publish(StoreMutation::group(
                MutationKind::GroupCreated,
                group.id,
                Utc::now(),
            ));
        }
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rankwarden_events::InMemoryEventBus;

    fn setup() -> (
        Arc<SessionRegistry>,
        Arc<InMemoryEventBus<StoreMutation>>,
        InMemoryPermissionStore<Arc<InMemoryEventBus<StoreMutation>>>,
    ) {
        let registry = Arc::new(SessionRegistry::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let store = InMemoryPermissionStore::new(registry.clone(), bus.clone());
        store.ensure_default_group().unwrap();
        (registry, bus, store)
    }

    fn perm(s: &str) -> PermissionString {
        PermissionString::new(s).unwrap()
    }

    #[test]
    fn ensure_default_group_is_idempotent() {
        let (_registry, _bus, store) = setup();
        let first = store.ensure_default_group().unwrap();
        let second = store.ensure_default_group().unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.fetch_all_groups().unwrap().len(), 1);
    }

    #[test]
    fn create_group_rejects_duplicate_names() {
        let (_registry, _bus, store) = setup();
        store.create_group(GroupName::new("vip").unwrap()).unwrap();
        let result = store.create_group(GroupName::new("vip").unwrap());
        assert!(matches!(result, Err(StoreError::NameTaken(_))));
    }

    #[test]
    fn default_group_cannot_be_deleted_or_renamed() {
        let (_registry, _bus, store) = setup();
        let default = store.fetch_group(&GroupName::default_group()).unwrap().unwrap();

        assert!(matches!(
            store.delete_group(default.id),
            Err(StoreError::Domain(DomainError::InvariantViolation(_)))
        ));
        assert!(matches!(
            store.update_group(default.id, GroupUpdate::rename(GroupName::new("dflt").unwrap())),
            Err(StoreError::Domain(DomainError::InvariantViolation(_)))
        ));
    }

    #[test]
    fn delete_group_cascades_members_and_permissions() {
        let (_registry, _bus, store) = setup();
        let vip = store.create_group(GroupName::new("vip").unwrap()).unwrap();
        store.attach_permission(vip.id, perm("fly.use")).unwrap();

        let p1 = PrincipalId::new();
        let p2 = PrincipalId::new();
        store.upsert_principal(p1, "alice").unwrap();
        store.upsert_principal(p2, "bob").unwrap();
        let deadline = MembershipExpiry::from_epoch_millis(Utc::now().timestamp_millis() + 60_000)
            .unwrap();
        store.update_principal_membership(p1, vip.id, deadline).unwrap();
        store
            .update_principal_membership(p2, vip.id, MembershipExpiry::Permanent)
            .unwrap();

        store.delete_group(vip.id).unwrap();

        let default = store.fetch_group(&GroupName::default_group()).unwrap().unwrap();
        for id in [p1, p2] {
            let principal = store.fetch_principal(id).unwrap().unwrap();
            assert_eq!(principal.group_id, default.id);
            assert!(principal.expiry.is_permanent());
        }
        let all = store.fetch_all_groups().unwrap();
        assert!(all.iter().all(|g| !g.has_permission(&perm("fly.use"))));
    }

    #[test]
    fn attach_detach_permission_round_trip() {
        let (_registry, _bus, store) = setup();
        let vip = store.create_group(GroupName::new("vip").unwrap()).unwrap();

        store.attach_permission(vip.id, perm("fly.use")).unwrap();
        // second attach is a no-op
        store.attach_permission(vip.id, perm("FLY.USE")).unwrap();
        let fetched = store.fetch_group_by_id(vip.id).unwrap().unwrap();
        assert_eq!(fetched.permissions.len(), 1);

        store.detach_permission(vip.id, &perm("fly.use")).unwrap();
        let fetched = store.fetch_group_by_id(vip.id).unwrap().unwrap();
        assert!(fetched.permissions.is_empty());
    }

    #[test]
    fn upsert_creates_first_contact_record_in_default_group() {
        let (_registry, _bus, store) = setup();
        let id = PrincipalId::new();

        let principal = store.upsert_principal(id, "steve").unwrap();
        let default = store.fetch_group(&GroupName::default_group()).unwrap().unwrap();
        assert_eq!(principal.group_id, default.id);
        assert!(principal.expiry.is_permanent());

        // reconnect with a new display name
        let principal = store.upsert_principal(id, "steve2").unwrap();
        assert_eq!(principal.name, "steve2");
        assert_eq!(store.fetch_principal(id).unwrap().unwrap().name, "steve2");
    }

    #[test]
    fn active_principals_follow_the_session_registry() {
        let (registry, _bus, store) = setup();
        let online = PrincipalId::new();
        let offline = PrincipalId::new();
        store.upsert_principal(online, "on").unwrap();
        store.upsert_principal(offline, "off").unwrap();

        registry.mark_active(online, "on");
        let active = store.fetch_active_principals().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, online);
    }

    #[test]
    fn mutations_are_published_in_order() {
        let (_registry, bus, store) = setup();
        let sub = bus.subscribe();

        let vip = store.create_group(GroupName::new("vip").unwrap()).unwrap();
        store.attach_permission(vip.id, perm("fly.use")).unwrap();
        store.delete_group(vip.id).unwrap();

        assert_eq!(sub.try_recv().unwrap().kind, MutationKind::GroupCreated);
        assert_eq!(sub.try_recv().unwrap().kind, MutationKind::PermissionAttached);
        assert_eq!(sub.try_recv().unwrap().kind, MutationKind::GroupDeleted);
        assert!(sub.try_recv().is_err());
    }

    #[test]
    fn membership_update_requires_existing_group_and_principal() {
        let (_registry, _bus, store) = setup();
        let vip = store.create_group(GroupName::new("vip").unwrap()).unwrap();

        let unknown_principal = PrincipalId::new();
        assert!(matches!(
            store.update_principal_membership(
                unknown_principal,
                vip.id,
                MembershipExpiry::Permanent
            ),
            Err(StoreError::PrincipalNotFound(_))
        ));

        let id = PrincipalId::new();
        store.upsert_principal(id, "steve").unwrap();
        assert!(matches!(
            store.update_principal_membership(id, GroupId::new(), MembershipExpiry::Permanent),
            Err(StoreError::GroupNotFound(_))
        ));
    }
}
