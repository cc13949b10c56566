//! # Peer Discovery
//!
//! Bootstrap-time peer discovery for a P2P full node.
//!
//! The crate covers three concerns:
//!
//! - **Seed discovery:** resolve DNS seeds (optionally through a SOCKS5
//!   proxy) and turn the answers into aged [`NetworkAddress`] records.
//! - **Address management:** a New/Tried bucketed [`AddressManager`] in the
//!   style of Bitcoin's `addrman`.
//! - **Initial connections:** dispatch operator-configured peers to a
//!   [`PeerDialer`], persistent or opportunistic.
//!
//! ## Architecture
//!
//! Hexagonal layout:
//! - **Domain Layer:** entities, address manager, peer selection
//! - **Ports Layer:** traits the node runtime implements or consumes
//! - **Service Layer:** seed discovery and connection dispatch
//! - **Adapters Layer:** system resolver, SOCKS5 resolver, system clock
//!
//! ## Example
//!
//! ```rust
//! use std::net::{IpAddr, Ipv4Addr};
//! use peer_discovery::{
//!     AddressManager, AddressManagerConfig, NetworkAddress, ServiceFlags, Timestamp,
//! };
//!
//! let now = Timestamp::new(1_700_000_000);
//! let mut manager = AddressManager::new(AddressManagerConfig::default());
//!
//! let seed = NetworkAddress::new(
//!     IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7)),
//!     8333,
//!     now.sub_secs(3 * 24 * 60 * 60),
//!     ServiceFlags::NODE_NETWORK,
//! );
//! let source = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
//!
//! assert_eq!(manager.add_addresses(vec![seed], &source, now), 1);
//! ```

pub mod domain;
pub mod ports;
pub mod service;

/// Concrete resolvers and clock.
pub mod adapters;

/// Test utilities (FixedTimeSource, MockSeedResolver, recording ports).
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use domain::{
    AddressEntry, AddressManager, AddressManagerConfig, AddressManagerError, AddressManagerStats,
    InitialPeerList, InitialPeerSet, NetworkAddress, PeerKind, ResolveError, ServiceFlags,
    SubnetKey, Timestamp,
};
pub use ports::{AddressPool, PeerDialer, SeedResolver, TimeSource};
pub use service::{ConnectionOrchestrator, DiscoveryConfig, SeedDiscovery};

#[cfg(feature = "network")]
pub use adapters::{SocksResolver, SystemSeedResolver};
pub use adapters::SystemTimeSource;
