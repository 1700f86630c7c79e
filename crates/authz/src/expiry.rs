//! Membership expiry monitoring.

use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use rankwarden_core::{GroupName, MembershipExpiry, SessionRegistry};
use rankwarden_store::PermissionStore;

/// Expiry monitor configuration.
#[derive(Debug, Clone)]
pub struct ExpiryMonitorConfig {
    /// How often to sweep active principals.
    pub poll_interval: Duration,
    /// Name for logging and the thread.
    pub name: String,
}

impl Default for ExpiryMonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            name: "expiry-monitor".to_string(),
        }
    }
}

impl ExpiryMonitorConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Monitor runtime statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SweepStats {
    pub sweeps: u64,
    pub demotions: u64,
    pub failures: u64,
}

/// Result of a single sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Memberships demoted to permanent-in-default.
    pub demotions: u64,
    /// Per-principal persistence failures (logged, skipped).
    pub failures: u64,
    /// Active sessions with no resolvable store record.
    pub missing_records: u64,
}

/// Handle to control a running monitor.
#[derive(Debug)]
pub struct ExpiryMonitorHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<SweepStats>>,
}

impl ExpiryMonitorHandle {
    /// Request graceful shutdown.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }

    /// Get current monitor statistics.
    pub fn stats(&self) -> SweepStats {
        self.stats.lock().unwrap().clone()
    }
}

/// Background sweep demoting lapsed time-limited memberships.
///
/// State machine per principal: `Permanent` or `Until(deadline)`. When the
/// deadline passes, the sweep persists `group := default, expiry :=
/// permanent` through the store, whose mutation notification then drives a
/// cache rebuild. Administrative membership changes may override either
/// state at any time; the sweep simply re-reads on its next pass.
pub struct ExpiryMonitor {
    store: Arc<dyn PermissionStore>,
    registry: Arc<SessionRegistry>,
}

impl ExpiryMonitor {
    pub fn new(store: Arc<dyn PermissionStore>, registry: Arc<SessionRegistry>) -> Self {
        Self { store, registry }
    }

    /// Run one sweep against the given clock.
    ///
    /// Never panics and never aborts early on per-principal failures; a
    /// sweep that cannot even fetch its working set logs and returns empty.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();

        let principals = match self.store.fetch_active_principals() {
            Ok(principals) => principals,
            Err(e) => {
                warn!(error = %e, "expiry sweep could not fetch active principals");
                return outcome;
            }
        };

        let session_count = self.registry.active_count();
        if principals.len() != session_count {
            // Recoverable: a principal can be connected before its record
            // lands in the store. The sweep skips what it cannot resolve.
            outcome.missing_records = session_count.abs_diff(principals.len()) as u64;
            warn!(
                records = principals.len(),
                sessions = session_count,
                "active principal records out of sync with session layer"
            );
        }

        if principals.iter().all(|p| !p.is_membership_expired(now)) {
            return outcome;
        }

        let default_group = match self.store.fetch_group(&GroupName::default_group()) {
            Ok(Some(group)) => group,
            Ok(None) => {
                warn!("default group missing, skipping expiry sweep");
                return outcome;
            }
            Err(e) => {
                warn!(error = %e, "expiry sweep could not fetch the default group");
                return outcome;
            }
        };

        for principal in principals {
            if !principal.is_membership_expired(now) {
                continue;
            }
            match self.store.update_principal_membership(
                principal.id,
                default_group.id,
                MembershipExpiry::Permanent,
            ) {
                Ok(_) => {
                    info!(
                        principal = %principal.id,
                        name = %principal.name,
                        "time-limited membership expired, reverted to default group"
                    );
                    outcome.demotions += 1;
                }
                Err(e) => {
                    warn!(
                        principal = %principal.id,
                        error = %e,
                        "failed to persist expiry demotion, will retry next sweep"
                    );
                    outcome.failures += 1;
                }
            }
        }

        outcome
    }

    /// Spawn the monitor in a background thread. Sweeps once immediately,
    /// then on every poll interval until shutdown.
    pub fn spawn(self, config: ExpiryMonitorConfig) -> ExpiryMonitorHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let stats = Arc::new(Mutex::new(SweepStats::default()));
        let stats_clone = stats.clone();
        let name = config.name.clone();

        let join = thread::Builder::new()
            .name(config.name.clone())
            .spawn(move || {
                loop {
                    let outcome = self.sweep_at(Utc::now());
                    {
                        let mut stats = stats_clone.lock().unwrap();
                        stats.sweeps += 1;
                        stats.demotions += outcome.demotions;
                        stats.failures += outcome.failures;
                    }

                    match shutdown_rx.recv_timeout(config.poll_interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!(monitor = %name, "stopped");
            })
            .expect("failed to spawn expiry monitor thread");

        ExpiryMonitorHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            stats,
        }
    }
}
