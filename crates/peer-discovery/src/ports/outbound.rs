//! # Driven Ports (Outbound SPI)
//!
//! Interfaces this crate **requires** the host application to implement.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{NetworkAddress, ResolveError, Timestamp};

/// Resolves a DNS seed hostname to the IPs it advertises.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; seeds are resolved concurrently
/// from independent tasks.
#[async_trait]
pub trait SeedResolver: Send + Sync {
    /// Resolve `host`, through `proxy` when one is given.
    ///
    /// A seed with no records resolves to an empty list, not an error.
    async fn resolve(&self, host: &str, proxy: Option<SocketAddr>)
        -> Result<Vec<IpAddr>, ResolveError>;
}

/// Abstract interface for time operations.
///
/// Allows deterministic testing by injecting a controlled clock.
pub trait TimeSource: Send + Sync {
    /// Get the current Unix timestamp in seconds.
    fn now(&self) -> Timestamp;
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Bulk insertion into the node's address pool.
pub trait AddressPool: Send + Sync {
    /// Insert every address in one call; returns how many were new.
    fn add_addresses(&self, addresses: Vec<NetworkAddress>) -> usize;
}

/// Non-blocking outbound connection requests.
pub trait PeerDialer: Send + Sync {
    /// Queue a connection attempt and return immediately.
    ///
    /// Failures are handled (and logged) by the implementation; the caller
    /// never learns about them.
    fn connect(&self, endpoint: &str, persistent: bool);
}
