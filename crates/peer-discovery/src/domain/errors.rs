//! Error types for the peer discovery domain.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Failure to resolve a single DNS seed.
///
/// Seed failures are never fatal to the node; they are logged and the
/// seed contributes nothing.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("lookup of {host} failed: {reason}")]
    Lookup { host: String, reason: String },

    #[error("lookup of {host} timed out after {timeout:?}")]
    Timeout { host: String, timeout: Duration },

    #[error("proxy {proxy} could not resolve {host}: {reason}")]
    Proxy {
        proxy: SocketAddr,
        host: String,
        reason: String,
    },
}

impl ResolveError {
    pub fn host(&self) -> &str {
        match self {
            Self::Lookup { host, .. } | Self::Timeout { host, .. } | Self::Proxy { host, .. } => {
                host
            }
        }
    }
}

/// Errors from address manager operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressManagerError {
    /// Unspecified IP or port zero.
    #[error("address {0} cannot be dialed")]
    InvalidAddress(SocketAddr),
}
