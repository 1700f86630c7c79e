//! Principal activation and capability interception.
//!
//! Hosts don't get patched: they ask for a capability object per principal
//! through [`SessionManager::activate`] and route their native "can X do P"
//! check through it. Deactivation removes the object so no stale identity is
//! referenced after a principal disconnects.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use rankwarden_core::{PrincipalId, SessionRegistry};
use rankwarden_store::{PermissionStore, StoreError};

use crate::cache::AuthorizationCache;
use crate::resolver::PermissionResolver;

/// The check a host installs in place of its native permission table.
pub trait PermissionCapability: Send + Sync {
    /// Answer "does this principal hold `permission`".
    fn has_permission(&self, permission: &str) -> bool;
}

/// Capability backed by the group cache and resolver.
pub struct GroupCapability {
    principal_id: PrincipalId,
    resolver: Arc<PermissionResolver>,
}

impl GroupCapability {
    pub fn new(principal_id: PrincipalId, resolver: Arc<PermissionResolver>) -> Self {
        Self {
            principal_id,
            resolver,
        }
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }
}

impl PermissionCapability for GroupCapability {
    fn has_permission(&self, permission: &str) -> bool {
        // No one can hold an empty permission.
        if permission.trim().is_empty() {
            return false;
        }
        self.resolver.is_allowed(self.principal_id, permission)
    }
}

/// Per-principal lifecycle: session registration, first-contact record sync,
/// narrow cache update, and capability installation.
pub struct SessionManager {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn PermissionStore>,
    cache: Arc<AuthorizationCache>,
    resolver: Arc<PermissionResolver>,
    capabilities: RwLock<HashMap<PrincipalId, Arc<dyn PermissionCapability>>>,
}

impl SessionManager {
    pub fn new(
        registry: Arc<SessionRegistry>,
        store: Arc<dyn PermissionStore>,
        cache: Arc<AuthorizationCache>,
        resolver: Arc<PermissionResolver>,
    ) -> Self {
        Self {
            registry,
            store,
            cache,
            resolver,
            capabilities: RwLock::new(HashMap::new()),
        }
    }

    /// Activate a principal (e.g. on connect) and return its capability.
    ///
    /// Syncs the store record (creating it in the default group on first
    /// contact, refreshing the display name, repairing a dangling group
    /// reference) and applies a narrow cache update instead of a full
    /// rebuild. Idempotent: re-activating an already-active principal
    /// refreshes its record but returns the capability already installed.
    pub fn activate(
        &self,
        id: PrincipalId,
        display_name: &str,
    ) -> Result<Arc<dyn PermissionCapability>, StoreError> {
        self.registry.mark_active(id, display_name);

        let principal = self.store.upsert_principal(id, display_name)?;
        let group = self
            .store
            .fetch_group_by_id(principal.group_id)?
            .ok_or(StoreError::GroupNotFound(principal.group_id))?;
        self.cache.cache_single(id, &group);

        let mut capabilities = self.capabilities.write().unwrap();
        if let Some(existing) = capabilities.get(&id) {
            return Ok(existing.clone());
        }

        let capability: Arc<dyn PermissionCapability> =
            Arc::new(GroupCapability::new(id, self.resolver.clone()));
        capabilities.insert(id, capability.clone());
        debug!(principal = %id, name = %display_name, "capability installed");
        Ok(capability)
    }

    /// Deactivate a principal (e.g. on disconnect): uninstall the capability
    /// and drop the session entry. The principal's snapshot entry disappears
    /// with the next rebuild.
    pub fn deactivate(&self, id: PrincipalId) {
        self.capabilities.write().unwrap().remove(&id);
        self.registry.mark_inactive(id);
        debug!(principal = %id, "capability removed");
    }

    /// The installed capability for an active principal, if any.
    pub fn capability(&self, id: PrincipalId) -> Option<Arc<dyn PermissionCapability>> {
        self.capabilities.read().unwrap().get(&id).cloned()
    }
}
