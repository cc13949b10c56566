//! SOCKS5 hostname resolution through Tor.
//!
//! Tor extends SOCKS5 with a `RESOLVE` command (`0xF0`) that answers with
//! the address record of a hostname without opening a stream, so seed
//! lookups never touch the local resolver.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;

const SOCKS_VERSION: u8 = 0x05;
const AUTH_NONE: u8 = 0x00;
const CMD_TOR_RESOLVE: u8 = 0xF0;
const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;

/// Errors from a SOCKS5 exchange.
#[derive(Debug, Error)]
pub enum SocksError {
    #[error("proxy I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("hostname is {0} bytes, SOCKS5 allows at most 255")]
    HostTooLong(usize),

    #[error("proxy speaks SOCKS version {0}, expected 5")]
    Version(u8),

    #[error("proxy refused unauthenticated access")]
    AuthRejected,

    #[error("proxy replied {code:#04x}: {message}")]
    Reply { code: u8, message: &'static str },

    #[error("proxy returned unsupported address type {0:#04x}")]
    AddressType(u8),
}

fn reply_message(code: u8) -> &'static str {
    match code {
        0x01 => "general failure",
        0x02 => "connection not allowed by ruleset",
        0x03 => "network unreachable",
        0x04 => "host unreachable",
        0x05 => "connection refused",
        0x06 => "TTL expired",
        0x07 => "command not supported",
        0x08 => "address type not supported",
        _ => "unknown error",
    }
}

/// Resolves hostnames through a Tor SOCKS5 proxy.
#[derive(Debug, Clone, Copy)]
pub struct SocksResolver {
    proxy: SocketAddr,
}

impl SocksResolver {
    pub fn new(proxy: SocketAddr) -> Self {
        Self { proxy }
    }

    /// Resolve `host` to a single IP using the `RESOLVE` extension.
    pub async fn resolve(&self, host: &str) -> Result<IpAddr, SocksError> {
        if host.len() > usize::from(u8::MAX) {
            return Err(SocksError::HostTooLong(host.len()));
        }

        let mut stream = TcpStream::connect(self.proxy).await?;
        Self::negotiate(&mut stream).await?;

        let mut request = Vec::with_capacity(7 + host.len());
        request.extend_from_slice(&[SOCKS_VERSION, CMD_TOR_RESOLVE, 0x00, ATYP_DOMAIN]);
        request.push(host.len() as u8);
        request.extend_from_slice(host.as_bytes());
        request.extend_from_slice(&0u16.to_be_bytes());
        stream.write_all(&request).await?;

        let ip = Self::read_reply(&mut stream).await?;
        trace!(proxy = %self.proxy, host, %ip, "Resolved through proxy");
        Ok(ip)
    }

    async fn negotiate(stream: &mut TcpStream) -> Result<(), SocksError> {
        stream.write_all(&[SOCKS_VERSION, 0x01, AUTH_NONE]).await?;

        let mut choice = [0u8; 2];
        stream.read_exact(&mut choice).await?;
        if choice[0] != SOCKS_VERSION {
            return Err(SocksError::Version(choice[0]));
        }
        if choice[1] != AUTH_NONE {
            return Err(SocksError::AuthRejected);
        }
        Ok(())
    }

    async fn read_reply(stream: &mut TcpStream) -> Result<IpAddr, SocksError> {
        let mut header = [0u8; 4];
        stream.read_exact(&mut header).await?;
        if header[0] != SOCKS_VERSION {
            return Err(SocksError::Version(header[0]));
        }
        if header[1] != 0x00 {
            return Err(SocksError::Reply {
                code: header[1],
                message: reply_message(header[1]),
            });
        }

        let ip = match header[3] {
            ATYP_IPV4 => {
                let mut octets = [0u8; 4];
                stream.read_exact(&mut octets).await?;
                IpAddr::V4(Ipv4Addr::from(octets))
            }
            ATYP_IPV6 => {
                let mut octets = [0u8; 16];
                stream.read_exact(&mut octets).await?;
                IpAddr::V6(Ipv6Addr::from(octets))
            }
            other => return Err(SocksError::AddressType(other)),
        };

        // Bound port, meaningless for RESOLVE.
        let mut port = [0u8; 2];
        stream.read_exact(&mut port).await?;
        Ok(ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Minimal proxy: accepts one client, checks the RESOLVE request and
    /// answers with `reply`.
    async fn spawn_proxy(expected_host: &'static str, reply: Vec<u8>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();

            let mut greeting = [0u8; 3];
            stream.read_exact(&mut greeting).await.unwrap();
            assert_eq!(greeting, [0x05, 0x01, 0x00]);
            stream.write_all(&[0x05, 0x00]).await.unwrap();

            let mut head = [0u8; 5];
            stream.read_exact(&mut head).await.unwrap();
            assert_eq!(&head[..4], &[0x05, 0xF0, 0x00, 0x03]);
            let mut host = vec![0u8; head[4] as usize];
            stream.read_exact(&mut host).await.unwrap();
            assert_eq!(host, expected_host.as_bytes());
            let mut port = [0u8; 2];
            stream.read_exact(&mut port).await.unwrap();

            stream.write_all(&reply).await.unwrap();
        });

        addr
    }

    #[tokio::test]
    async fn test_resolve_returns_ipv4_record() {
        let proxy = spawn_proxy(
            "seed.example.org",
            vec![0x05, 0x00, 0x00, 0x01, 203, 0, 113, 9, 0, 0],
        )
        .await;

        let ip = SocksResolver::new(proxy)
            .resolve("seed.example.org")
            .await
            .unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9)));
    }

    #[tokio::test]
    async fn test_resolve_maps_failure_reply() {
        let proxy = spawn_proxy(
            "missing.example.org",
            vec![0x05, 0x04, 0x00, 0x01, 0, 0, 0, 0, 0, 0],
        )
        .await;

        let err = SocksResolver::new(proxy)
            .resolve("missing.example.org")
            .await
            .unwrap_err();
        assert!(matches!(err, SocksError::Reply { code: 0x04, .. }));
        assert!(err.to_string().contains("host unreachable"));
    }

    #[tokio::test]
    async fn test_resolve_rejects_long_hostname() {
        let host = "a".repeat(256);
        let proxy: SocketAddr = "127.0.0.1:9".parse().unwrap();

        let err = SocksResolver::new(proxy).resolve(&host).await.unwrap_err();
        assert!(matches!(err, SocksError::HostTooLong(256)));
    }
}
