use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use peer_discovery::{
    AddressManager, AddressManagerConfig, AddressManagerStats, AddressPool, NetworkAddress,
    TimeSource,
};

/// Source recorded for addresses the node learned on its own (DNS seeds,
/// configured fallbacks) rather than from a peer.
const LOCAL_SOURCE: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Wrapper around a shared `AddressManager` implementing [`AddressPool`].
///
/// The peer server and the lifecycle both hold clones; all access goes
/// through the `Arc<RwLock>`.
#[derive(Clone)]
pub struct SharedAddressManager {
    pub inner: Arc<RwLock<AddressManager>>,
    time_source: Arc<dyn TimeSource>,
}

impl SharedAddressManager {
    pub fn new(config: AddressManagerConfig, time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(AddressManager::new(config))),
            time_source,
        }
    }

    /// Promote an address after a successful outbound connection.
    pub fn mark_good(&self, addr: &SocketAddr) {
        let now = self.time_source.now();
        match self.inner.write().mark_good(addr, now) {
            Ok(true) => debug!(%addr, "Address promoted to tried"),
            Ok(false) => {}
            Err(e) => warn!(%addr, error = %e, "Failed to promote address"),
        }
    }

    pub fn mark_attempt(&self, addr: &SocketAddr) {
        let now = self.time_source.now();
        self.inner.write().mark_attempt(addr, now);
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.inner.read().contains(addr)
    }

    pub fn stats(&self) -> AddressManagerStats {
        self.inner.read().stats()
    }
}

impl AddressPool for SharedAddressManager {
    fn add_addresses(&self, addresses: Vec<NetworkAddress>) -> usize {
        let offered = addresses.len();
        let now = self.time_source.now();
        let added = self
            .inner
            .write()
            .add_addresses(addresses, &LOCAL_SOURCE, now);
        debug!(offered, added, "Address pool updated");
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peer_discovery::test_utils::FixedTimeSource;
    use peer_discovery::ServiceFlags;

    const NOW: u64 = 1_700_000_000;

    fn pool() -> SharedAddressManager {
        SharedAddressManager::new(
            AddressManagerConfig::default(),
            Arc::new(FixedTimeSource::new(NOW)),
        )
    }

    fn addr(a: u8, age_secs: u64) -> NetworkAddress {
        NetworkAddress::new(
            IpAddr::V4(Ipv4Addr::new(a, a, 1, 1)),
            8333,
            peer_discovery::Timestamp::new(NOW - age_secs),
            ServiceFlags::NODE_NETWORK,
        )
    }

    #[test]
    fn test_add_addresses_counts_new_entries() {
        let pool = pool();

        let added = pool.add_addresses(vec![addr(1, 3600), addr(2, 3600), addr(1, 3600)]);

        assert_eq!(added, 2);
        assert_eq!(pool.stats().new_count, 2);
    }

    #[test]
    fn test_stale_addresses_are_skipped() {
        let pool = pool();

        let added = pool.add_addresses(vec![addr(3, 40 * 24 * 3600)]);

        assert_eq!(added, 0);
    }

    #[test]
    fn test_mark_good_promotes() {
        let pool = pool();
        let a = addr(4, 3600);
        pool.add_addresses(vec![a]);

        pool.mark_good(&a.socket_addr());

        let stats = pool.stats();
        assert_eq!((stats.new_count, stats.tried_count), (0, 1));
    }

    #[test]
    fn test_concurrent_inserts_are_safe() {
        let pool = pool();
        let handles: Vec<_> = (1..=8u8)
            .map(|i| {
                let pool = pool.clone();
                std::thread::spawn(move || pool.add_addresses(vec![addr(i, 60)]))
            })
            .collect();

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 8);
        assert_eq!(pool.stats().total(), 8);
    }
}
