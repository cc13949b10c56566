//! # Service Layer
//!
//! - [`SeedDiscovery`] resolves DNS seeds and synthesizes address records.
//! - [`ConnectionOrchestrator`] dispatches the initial peer set to a dialer.

mod connect;
mod discovery;

pub use connect::ConnectionOrchestrator;
pub use discovery::{
    seeded_timestamp, DiscoveryConfig, SeedDiscovery, DEFAULT_RESOLVE_TIMEOUT, SEED_AGE_MIN_SECS,
    SEED_AGE_SPREAD_SECS,
};
