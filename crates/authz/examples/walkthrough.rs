//! Minimal embedding-host walkthrough: bootstrap the engine, connect a
//! player, grant a time-limited membership, and watch it expire.
//!
//! ```sh
//! cargo run -p rankwarden-authz --example walkthrough
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};

use rankwarden_authz::{
    AuthorizationCache, CacheInvalidator, ExpiryMonitor, ExpiryMonitorConfig, PermissionResolver,
    SessionManager,
};
use rankwarden_core::{
    EngineConfig, GroupName, MembershipExpiry, PermissionString, PrincipalId, SessionRegistry,
};
use rankwarden_events::InMemoryEventBus;
use rankwarden_store::{InMemoryPermissionStore, PermissionStore};

fn main() -> anyhow::Result<()> {
    rankwarden_observability::tracing::init();
    let config = EngineConfig::default();

    // Bootstrap: everything is constructed once and passed around as Arcs.
    let registry = Arc::new(SessionRegistry::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let store = Arc::new(InMemoryPermissionStore::new(registry.clone(), bus.clone()));
    store.ensure_default_group()?;

    let cache = Arc::new(AuthorizationCache::new());
    let resolver = Arc::new(PermissionResolver::new(cache.clone()));
    let invalidator = Arc::new(CacheInvalidator::new(cache.clone(), store.clone()));
    let sessions = SessionManager::new(
        registry.clone(),
        store.clone(),
        cache.clone(),
        resolver.clone(),
    );

    let listener = invalidator.spawn_listener(&bus);
    let rebuild_timer = invalidator.spawn_periodic(config.cache_rebuild_interval());
    let monitor = ExpiryMonitor::new(store.clone(), registry.clone()).spawn(
        ExpiryMonitorConfig::default().with_poll_interval(Duration::from_millis(100)),
    );

    // An admin sets up a vip group.
    let vip = store.create_group(GroupName::new("vip")?)?;
    store.attach_permission(vip.id, PermissionString::new("fly.*")?)?;

    // A player connects; the host installs the returned capability in place
    // of its native permission check.
    let player = PrincipalId::new();
    let capability = sessions.activate(player, "steve")?;
    println!("fresh player, fly.use -> {}", capability.has_permission("fly.use"));

    // Grant vip for one second.
    store.update_principal_membership(
        player,
        vip.id,
        MembershipExpiry::Until(Utc::now() + ChronoDuration::seconds(1)),
    )?;
    std::thread::sleep(Duration::from_millis(300));
    println!("vip granted,   fly.use -> {}", capability.has_permission("fly.use"));

    // Wait for the expiry monitor to demote the membership.
    std::thread::sleep(Duration::from_millis(1500));
    println!("vip expired,   fly.use -> {}", capability.has_permission("fly.use"));

    sessions.deactivate(player);
    monitor.shutdown();
    rebuild_timer.shutdown();
    listener.shutdown();
    Ok(())
}
