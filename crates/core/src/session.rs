//! Registry of currently active (connected) principals.
//!
//! This is the session layer's view of who is online. The store consults it
//! to answer "fetch all active principals' records", and the expiry monitor
//! compares its count against the store's to surface missing records.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::id::PrincipalId;

/// Thread-safe set of active principals with their display names.
///
/// Mutated from connection-lifecycle handlers, read from background sweeps
/// and store queries. Plain `RwLock` is sufficient: the map is small and
/// contention is limited to connect/disconnect events.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    active: RwLock<HashMap<PrincipalId, String>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a principal as active. Re-marking updates the display name.
    pub fn mark_active(&self, id: PrincipalId, display_name: impl Into<String>) {
        self.active.write().unwrap().insert(id, display_name.into());
    }

    /// Record a principal as no longer active.
    pub fn mark_inactive(&self, id: PrincipalId) {
        self.active.write().unwrap().remove(&id);
    }

    pub fn is_active(&self, id: PrincipalId) -> bool {
        self.active.read().unwrap().contains_key(&id)
    }

    pub fn display_name(&self, id: PrincipalId) -> Option<String> {
        self.active.read().unwrap().get(&id).cloned()
    }

    pub fn active_ids(&self) -> Vec<PrincipalId> {
        self.active.read().unwrap().keys().copied().collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_and_unmark() {
        let registry = SessionRegistry::new();
        let id = PrincipalId::new();

        registry.mark_active(id, "steve");
        assert!(registry.is_active(id));
        assert_eq!(registry.display_name(id).as_deref(), Some("steve"));
        assert_eq!(registry.active_count(), 1);

        registry.mark_inactive(id);
        assert!(!registry.is_active(id));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn remark_updates_display_name() {
        let registry = SessionRegistry::new();
        let id = PrincipalId::new();

        registry.mark_active(id, "steve");
        registry.mark_active(id, "steve_renamed");
        assert_eq!(registry.active_count(), 1);
        assert_eq!(
            registry.display_name(id).as_deref(),
            Some("steve_renamed")
        );
    }
}
