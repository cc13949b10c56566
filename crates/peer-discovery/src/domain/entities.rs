//! Core domain entities for peer discovery.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::ops::BitOr;

/// Unix timestamp in seconds.
///
/// # Bounds
///
/// Timestamps are clamped to a reasonable maximum so that comparisons and
/// age arithmetic never overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Maximum reasonable timestamp (year 9999).
    pub const MAX_REASONABLE: u64 = 253_402_300_799;

    /// Create a new timestamp, clamping to MAX_REASONABLE.
    pub fn new(secs: u64) -> Self {
        Self(secs.min(Self::MAX_REASONABLE))
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Add seconds to timestamp (saturating at MAX_REASONABLE).
    pub fn add_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs).min(Self::MAX_REASONABLE))
    }

    /// Subtract seconds from timestamp (saturating at 0).
    pub fn sub_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_sub(secs))
    }

    /// Seconds elapsed between `self` and a later `now`; zero if `self` is in the future.
    pub fn age_at(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Service bits a peer advertises alongside its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ServiceFlags(u64);

impl ServiceFlags {
    /// No services.
    pub const NONE: Self = Self(0);
    /// The peer serves the full block chain.
    pub const NODE_NETWORK: Self = Self(1);

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// True if every bit of `other` is set in `self`.
    pub const fn contains(&self, other: ServiceFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ServiceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A peer address believed to be reachable, as stored by the address manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkAddress {
    pub ip: IpAddr,
    pub port: u16,
    /// Last time the address was believed to be live.
    pub timestamp: Timestamp,
    pub services: ServiceFlags,
}

impl NetworkAddress {
    pub fn new(ip: IpAddr, port: u16, timestamp: Timestamp, services: ServiceFlags) -> Self {
        Self {
            ip,
            port,
            timestamp,
            services,
        }
    }

    pub fn from_socket_addr(addr: SocketAddr, timestamp: Timestamp, services: ServiceFlags) -> Self {
        Self::new(addr.ip(), addr.port(), timestamp, services)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// Unspecified IPs and port zero can never be dialed.
    pub fn is_dialable(&self) -> bool {
        self.port != 0 && !self.ip.is_unspecified()
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}
