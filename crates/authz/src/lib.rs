//! `rankwarden-authz` — the authorization cache and resolution engine.
//!
//! Answers "does principal X hold permission string P" on the hot path:
//! an in-memory snapshot of groups and memberships ([`cache`]), wildcard
//! matching with defined precedence ([`resolver`]), full-rebuild
//! invalidation after store mutations ([`invalidator`]), a background sweep
//! demoting lapsed time-limited memberships ([`expiry`]), and the
//! per-principal capability objects hosts install in place of their native
//! permission check ([`session`]).
//!
//! Everything is dependency-injected: construct the store, registry, cache,
//! and resolver once at bootstrap and share them as `Arc`s.

pub mod cache;
pub mod expiry;
pub mod invalidator;
pub mod resolver;
pub mod session;
pub mod snapshot;
pub mod worker;

pub use cache::AuthorizationCache;
pub use expiry::{ExpiryMonitor, ExpiryMonitorConfig, ExpiryMonitorHandle, SweepOutcome, SweepStats};
pub use invalidator::CacheInvalidator;
pub use resolver::PermissionResolver;
pub use session::{GroupCapability, PermissionCapability, SessionManager};
pub use snapshot::{CachedGroup, Snapshot};
pub use worker::WorkerHandle;
