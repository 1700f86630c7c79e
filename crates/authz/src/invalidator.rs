//! Cache invalidation policy.

use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use tracing::{debug, warn};

use rankwarden_events::{EventBus, StoreMutation};
use rankwarden_store::PermissionStore;

use crate::cache::AuthorizationCache;
use crate::worker::WorkerHandle;

const LISTENER_TICK: Duration = Duration::from_millis(250);

/// Turns "the store changed" into a full cache rebuild.
///
/// Every qualifying mutation rebuilds the whole snapshot, chosen over
/// incremental patching for correctness simplicity at the expected scale
/// (hundreds of groups/principals; writes are administrative, not per-tick).
/// Rebuilds are idempotent re-derivations of store state, so concurrent
/// triggers may coalesce last-writer-wins.
///
/// Cloning is cheap (two `Arc`s); clones share the same cache and store.
#[derive(Clone)]
pub struct CacheInvalidator {
    cache: Arc<AuthorizationCache>,
    store: Arc<dyn PermissionStore>,
}

impl CacheInvalidator {
    pub fn new(cache: Arc<AuthorizationCache>, store: Arc<dyn PermissionStore>) -> Self {
        Self { cache, store }
    }

    /// Notification hook: call after every successful store write.
    ///
    /// A failed rebuild keeps the previous snapshot and is logged, never
    /// raised; the read path must stay error-free.
    pub fn on_mutated(&self) {
        if let Err(e) = self.cache.rebuild(self.store.as_ref()) {
            warn!(error = %e, "cache rebuild failed, serving previous snapshot");
        }
    }

    /// Spawn a listener that rebuilds whenever the store publishes a
    /// mutation. Bursts of queued mutations coalesce into one rebuild.
    /// Connection-path `PrincipalSeen` syncs are skipped; the session layer
    /// already applied a narrow update for those.
    pub fn spawn_listener<B>(&self, bus: &B) -> WorkerHandle
    where
        B: EventBus<StoreMutation>,
    {
        let sub = bus.subscribe();
        let invalidator = self.clone();

        WorkerHandle::spawn("cache-invalidator", move |shutdown_rx| {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }
                match sub.recv_timeout(LISTENER_TICK) {
                    Ok(mutation) => {
                        let mut pending = mutation.kind.invalidates_cache();
                        while let Ok(next) = sub.try_recv() {
                            pending |= next.kind.invalidates_cache();
                        }
                        if pending {
                            invalidator.on_mutated();
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!(worker = "cache-invalidator", "stopped");
        })
    }

    /// Spawn a timer that rebuilds on a fixed schedule regardless of
    /// mutations, as a safety net for anything that slipped past the
    /// mutation-driven path.
    pub fn spawn_periodic(&self, interval: Duration) -> WorkerHandle {
        let invalidator = self.clone();

        WorkerHandle::spawn("cache-rebuild-timer", move |shutdown_rx| {
            loop {
                match shutdown_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => invalidator.on_mutated(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!(worker = "cache-rebuild-timer", "stopped");
        })
    }
}
