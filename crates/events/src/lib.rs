//! `rankwarden-events` — pub/sub plumbing for store-change signals.
//!
//! The store publishes a [`StoreMutation`] after every successful write; the
//! cache invalidator subscribes and rebuilds. The bus itself is
//! transport-agnostic and makes no persistence or ordering promises beyond
//! per-publisher FIFO; consumers must be idempotent, which cache rebuilds
//! are by construction (they re-derive store state rather than accumulate).

pub mod bus;
pub mod in_memory_bus;
pub mod mutation;

pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use mutation::{MutationKind, StoreMutation};
