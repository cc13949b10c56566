//! Test utilities for peer discovery.
//!
//! Mock implementations of the ports for deterministic testing.
//! Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust
//! use peer_discovery::test_utils::FixedTimeSource;
//! use peer_discovery::TimeSource;
//!
//! let time_source = FixedTimeSource::new(1000);
//! assert_eq!(time_source.now().as_secs(), 1000);
//! ```

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::{NetworkAddress, ResolveError, Timestamp};
use crate::ports::{AddressPool, PeerDialer, SeedResolver, TimeSource};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A time source that returns a fixed timestamp.
#[derive(Debug, Clone)]
pub struct FixedTimeSource {
    timestamp: u64,
}

impl FixedTimeSource {
    pub fn new(timestamp: u64) -> Self {
        Self { timestamp }
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.timestamp)
    }
}

#[derive(Debug, Clone)]
enum SeedAnswer {
    Ips(Vec<IpAddr>),
    Fail(String),
    Hang,
}

/// Scripted seed resolver. Unknown hosts fail with a lookup error.
///
/// ```rust
/// use std::net::{IpAddr, Ipv4Addr};
/// use peer_discovery::test_utils::MockSeedResolver;
///
/// let resolver = MockSeedResolver::new()
///     .with_seed("seed.example.org", vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]);
/// assert!(resolver.calls().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct MockSeedResolver {
    answers: HashMap<String, SeedAnswer>,
    calls: Mutex<Vec<(String, Option<SocketAddr>)>>,
}

impl MockSeedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, host: &str, ips: Vec<IpAddr>) -> Self {
        self.answers.insert(host.to_string(), SeedAnswer::Ips(ips));
        self
    }

    pub fn with_failure(mut self, host: &str, reason: &str) -> Self {
        self.answers
            .insert(host.to_string(), SeedAnswer::Fail(reason.to_string()));
        self
    }

    /// The lookup for `host` never completes.
    pub fn with_hang(mut self, host: &str) -> Self {
        self.answers.insert(host.to_string(), SeedAnswer::Hang);
        self
    }

    /// Every `(host, proxy)` pair resolved so far, in call order.
    pub fn calls(&self) -> Vec<(String, Option<SocketAddr>)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl SeedResolver for MockSeedResolver {
    async fn resolve(
        &self,
        host: &str,
        proxy: Option<SocketAddr>,
    ) -> Result<Vec<IpAddr>, ResolveError> {
        lock(&self.calls).push((host.to_string(), proxy));

        match self.answers.get(host).cloned() {
            Some(SeedAnswer::Ips(ips)) => Ok(ips),
            Some(SeedAnswer::Fail(reason)) => Err(ResolveError::Lookup {
                host: host.to_string(),
                reason,
            }),
            Some(SeedAnswer::Hang) => std::future::pending().await,
            None => Err(ResolveError::Lookup {
                host: host.to_string(),
                reason: "no such host".to_string(),
            }),
        }
    }
}

/// Records every `connect` call.
#[derive(Debug, Default)]
pub struct RecordingDialer {
    calls: Mutex<Vec<(String, bool)>>,
}

impl RecordingDialer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(endpoint, persistent)` in dispatch order.
    pub fn calls(&self) -> Vec<(String, bool)> {
        lock(&self.calls).clone()
    }
}

impl PeerDialer for RecordingDialer {
    fn connect(&self, endpoint: &str, persistent: bool) {
        lock(&self.calls).push((endpoint.to_string(), persistent));
    }
}

/// Records every bulk insertion.
#[derive(Debug, Default)]
pub struct RecordingAddressPool {
    batches: Mutex<Vec<Vec<NetworkAddress>>>,
}

impl RecordingAddressPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<Vec<NetworkAddress>> {
        lock(&self.batches).clone()
    }
}

impl AddressPool for RecordingAddressPool {
    fn add_addresses(&self, addresses: Vec<NetworkAddress>) -> usize {
        let count = addresses.len();
        lock(&self.batches).push(addresses);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_time_source_returns_configured_value() {
        let time = FixedTimeSource::new(12345);
        assert_eq!(time.now().as_secs(), 12345);
        assert_eq!(time.timestamp(), 12345);
    }

    #[tokio::test]
    async fn test_mock_resolver_unknown_host_fails() {
        let resolver = MockSeedResolver::new();
        let err = resolver.resolve("nowhere", None).await.unwrap_err();
        assert_eq!(err.host(), "nowhere");
        assert_eq!(resolver.calls().len(), 1);
    }
}
