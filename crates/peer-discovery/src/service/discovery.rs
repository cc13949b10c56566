//! DNS seed discovery.
//!
//! Seeds answer with bare IPs. Each IP becomes a [`NetworkAddress`] on the
//! network's default port, advertising `NODE_NETWORK`, with a timestamp a
//! few days in the past so the address looks like any other gossip record
//! to the rest of the network.

use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::{NetworkAddress, ResolveError, ServiceFlags, Timestamp};
use crate::ports::{SeedResolver, TimeSource};

const DAY_SECS: u64 = 24 * 60 * 60;

/// Minimum age given to a seed-derived address.
pub const SEED_AGE_MIN_SECS: u64 = 3 * DAY_SECS;

/// Width of the random age window on top of the minimum.
pub const SEED_AGE_SPREAD_SECS: u64 = 4 * DAY_SECS;

pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Timestamp for a seed-derived address: `now` minus an age drawn from
/// `(3 days, 7 days]`, so the result always lies in `[now - 7d, now - 3d)`.
pub fn seeded_timestamp<R: Rng + ?Sized>(now: Timestamp, rng: &mut R) -> Timestamp {
    now.sub_secs(SEED_AGE_MIN_SECS + rng.gen_range(1..=SEED_AGE_SPREAD_SECS))
}

/// Seed discovery settings.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Seed hostnames.
    pub seeds: Vec<String>,
    /// SOCKS5 proxy for lookups; only set when Tor is enabled.
    pub proxy: Option<SocketAddr>,
    /// Port assigned to every discovered IP.
    pub default_port: u16,
    /// Upper bound on a single seed lookup.
    pub resolve_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            seeds: Vec::new(),
            proxy: None,
            default_port: 8333,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

/// Resolves DNS seeds into address records.
pub struct SeedDiscovery<T: TimeSource> {
    resolver: Arc<dyn SeedResolver>,
    time_source: T,
    config: DiscoveryConfig,
}

impl<T: TimeSource> SeedDiscovery<T> {
    pub fn new(resolver: Arc<dyn SeedResolver>, time_source: T, config: DiscoveryConfig) -> Self {
        Self {
            resolver,
            time_source,
            config,
        }
    }

    /// Resolve every seed and synthesize one record per distinct IP.
    ///
    /// Never fails: seeds that error or time out contribute nothing, and an
    /// empty result is valid.
    pub async fn discover(&self) -> Vec<NetworkAddress> {
        let ips = self.resolve_seeds().await;
        let mut rng = rand::thread_rng();
        let addresses = self.synthesize(&ips, &mut rng);
        info!(
            seeds = self.config.seeds.len(),
            addresses = addresses.len(),
            via_proxy = self.config.proxy.is_some(),
            "DNS seed discovery finished"
        );
        addresses
    }

    /// Resolve all seeds concurrently, each bounded by the resolve timeout,
    /// and merge the answers into one set.
    pub async fn resolve_seeds(&self) -> BTreeSet<IpAddr> {
        let mut lookups = JoinSet::new();
        for seed in &self.config.seeds {
            let resolver = Arc::clone(&self.resolver);
            let host = seed.clone();
            let proxy = self.config.proxy;
            let limit = self.config.resolve_timeout;
            lookups.spawn(async move {
                let outcome = match timeout(limit, resolver.resolve(&host, proxy)).await {
                    Ok(result) => result,
                    Err(_) => Err(ResolveError::Timeout {
                        host: host.clone(),
                        timeout: limit,
                    }),
                };
                (host, outcome)
            });
        }

        let mut ips = BTreeSet::new();
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((host, Ok(found))) => {
                    debug!(seed = %host, count = found.len(), "Resolved DNS seed");
                    ips.extend(found);
                }
                Ok((_, Err(e))) => {
                    warn!(seed = e.host(), error = %e, "DNS seed lookup failed");
                }
                Err(e) => {
                    warn!(error = %e, "DNS seed lookup task failed");
                }
            }
        }
        ips
    }

    /// One record per IP on the default port.
    pub fn synthesize<R: Rng + ?Sized>(
        &self,
        ips: &BTreeSet<IpAddr>,
        rng: &mut R,
    ) -> Vec<NetworkAddress> {
        let port = self.config.default_port;
        self.age_endpoints(ips.iter().map(|ip| SocketAddr::new(*ip, port)), rng)
    }

    /// Records for explicit endpoints, aged the same way as seed answers.
    pub fn age_endpoints<I, R>(&self, endpoints: I, rng: &mut R) -> Vec<NetworkAddress>
    where
        I: IntoIterator<Item = SocketAddr>,
        R: Rng + ?Sized,
    {
        let now = self.time_source.now();
        endpoints
            .into_iter()
            .map(|addr| {
                NetworkAddress::from_socket_addr(
                    addr,
                    seeded_timestamp(now, rng),
                    ServiceFlags::NODE_NETWORK,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FixedTimeSource, MockSeedResolver};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::net::Ipv4Addr;

    const NOW: u64 = 1_700_000_000;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(198, 51, 100, last))
    }

    fn discovery(resolver: MockSeedResolver, seeds: &[&str]) -> SeedDiscovery<FixedTimeSource> {
        SeedDiscovery::new(
            Arc::new(resolver),
            FixedTimeSource::new(NOW),
            DiscoveryConfig {
                seeds: seeds.iter().map(|s| s.to_string()).collect(),
                default_port: 18333,
                ..DiscoveryConfig::default()
            },
        )
    }

    #[test]
    fn test_seeded_timestamp_stays_in_window() {
        let now = Timestamp::new(NOW);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..10_000 {
            let ts = seeded_timestamp(now, &mut rng).as_secs();
            assert!(ts >= NOW - 7 * DAY_SECS, "too old: {}", ts);
            assert!(ts < NOW - 3 * DAY_SECS, "too recent: {}", ts);
        }
    }

    #[test]
    fn test_synthesize_uses_default_port_and_node_network() {
        let discovery = discovery(MockSeedResolver::new(), &[]);
        let ips: BTreeSet<IpAddr> = [ip(1), ip(2)].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(1);

        let addresses = discovery.synthesize(&ips, &mut rng);

        assert_eq!(addresses.len(), 2);
        for addr in &addresses {
            assert_eq!(addr.port, 18333);
            assert_eq!(addr.services, ServiceFlags::NODE_NETWORK);
            assert!(addr.timestamp < Timestamp::new(NOW - 3 * DAY_SECS));
        }
    }

    #[tokio::test]
    async fn test_overlapping_seeds_are_deduplicated() {
        let resolver = MockSeedResolver::new()
            .with_seed("a.seed", vec![ip(1), ip(2)])
            .with_seed("b.seed", vec![ip(2), ip(3)]);
        let discovery = discovery(resolver, &["a.seed", "b.seed"]);

        let addresses = discovery.discover().await;

        let mut got: Vec<IpAddr> = addresses.iter().map(|a| a.ip).collect();
        got.sort();
        assert_eq!(got, vec![ip(1), ip(2), ip(3)]);
    }

    #[tokio::test]
    async fn test_failing_seed_is_not_fatal() {
        let resolver = MockSeedResolver::new()
            .with_failure("broken.seed", "SERVFAIL")
            .with_seed("good.seed", vec![ip(9)]);
        let discovery = discovery(resolver, &["broken.seed", "good.seed"]);

        let addresses = discovery.discover().await;

        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses[0].ip, ip(9));
    }

    #[tokio::test]
    async fn test_hanging_seed_times_out() {
        let resolver = MockSeedResolver::new()
            .with_hang("slow.seed")
            .with_seed("fast.seed", vec![ip(4)]);
        let discovery = SeedDiscovery::new(
            Arc::new(resolver),
            FixedTimeSource::new(NOW),
            DiscoveryConfig {
                seeds: vec!["slow.seed".into(), "fast.seed".into()],
                resolve_timeout: Duration::from_millis(50),
                ..DiscoveryConfig::default()
            },
        );

        let ips = discovery.resolve_seeds().await;
        assert_eq!(ips.into_iter().collect::<Vec<_>>(), vec![ip(4)]);
    }

    #[tokio::test]
    async fn test_no_seeds_yields_nothing() {
        let discovery = discovery(MockSeedResolver::new(), &[]);
        assert!(discovery.discover().await.is_empty());
    }

    #[tokio::test]
    async fn test_proxy_is_handed_to_resolver() {
        let resolver = Arc::new(MockSeedResolver::new().with_seed("a.seed", vec![ip(1)]));
        let proxy: SocketAddr = "127.0.0.1:9050".parse().unwrap();
        let discovery = SeedDiscovery::new(
            resolver.clone(),
            FixedTimeSource::new(NOW),
            DiscoveryConfig {
                seeds: vec!["a.seed".into()],
                proxy: Some(proxy),
                ..DiscoveryConfig::default()
            },
        );

        discovery.discover().await;

        assert_eq!(resolver.calls(), vec![("a.seed".to_string(), Some(proxy))]);
    }

    #[test]
    fn test_age_endpoints_keeps_ports() {
        let discovery = discovery(MockSeedResolver::new(), &[]);
        let endpoint: SocketAddr = "203.0.113.5:9999".parse().unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let addresses = discovery.age_endpoints([endpoint], &mut rng);

        assert_eq!(addresses[0].socket_addr(), endpoint);
    }
}
