//! Address manager security types.
//!
//! SECURITY-CRITICAL: Contains types and logic for anti-eclipse defense.
//! Isolate for security audits.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::net::IpAddr;

/// Subnet key for grouping peers.
/// Stores /16 for IPv4 and /32 for IPv6.
///
/// # Security (Anti-Eclipse)
/// Used to ensure we don't accept too many peers from the same IP range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubnetKey(pub [u8; 4]);

impl SubnetKey {
    /// Extract subnet key from IP address.
    ///
    /// IPv4-mapped IPv6 addresses are grouped with their IPv4 form.
    pub fn from_ip(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => {
                let octets = v4.octets();
                SubnetKey([octets[0], octets[1], 0, 0])
            }
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => Self::from_ip(&IpAddr::V4(v4)),
                None => {
                    let octets = v6.octets();
                    SubnetKey([octets[0], octets[1], octets[2], octets[3]])
                }
            },
        }
    }
}

/// Keyed hash for bucket placement.
///
/// # Security
/// `RandomState` carries a per-process random SipHash key, so attackers
/// cannot predict which IPs map to which buckets.
pub fn secure_bucket_hash<T: Hash>(key: &RandomState, t: &T) -> u64 {
    key.hash_one(t)
}
