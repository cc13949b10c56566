//! System DNS seed resolver.

use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;

use super::socks::SocksResolver;
use crate::domain::ResolveError;
use crate::ports::SeedResolver;

/// Resolves seeds with the operating system resolver, or through a SOCKS5
/// proxy when one is supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSeedResolver;

impl SystemSeedResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SeedResolver for SystemSeedResolver {
    async fn resolve(
        &self,
        host: &str,
        proxy: Option<SocketAddr>,
    ) -> Result<Vec<IpAddr>, ResolveError> {
        match proxy {
            Some(proxy) => SocksResolver::new(proxy)
                .resolve(host)
                .await
                .map(|ip| vec![ip])
                .map_err(|e| ResolveError::Proxy {
                    proxy,
                    host: host.to_string(),
                    reason: e.to_string(),
                }),
            None => {
                let addrs = tokio::net::lookup_host((host, 0))
                    .await
                    .map_err(|e| ResolveError::Lookup {
                        host: host.to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(addrs.map(|addr| addr.ip()).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_resolves_ip_literal_without_network() {
        let ips = SystemSeedResolver::new()
            .resolve("127.0.0.1", None)
            .await
            .unwrap();
        assert_eq!(ips, vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]);
    }

    #[tokio::test]
    async fn test_unreachable_proxy_is_proxy_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let proxy = listener.local_addr().unwrap();
        drop(listener);

        let err = SystemSeedResolver::new()
            .resolve("seed.example.org", Some(proxy))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Proxy { .. }));
        assert_eq!(err.host(), "seed.example.org");
    }
}
