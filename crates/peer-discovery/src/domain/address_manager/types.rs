//! Address manager type definitions.

use super::security::SubnetKey;
use crate::domain::{NetworkAddress, Timestamp};

/// An address entry in the address manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressEntry {
    /// The advertised address record
    pub address: NetworkAddress,
    /// When we first learned about this address
    pub first_seen: Timestamp,
    /// When we last attempted connection
    pub last_attempt: Option<Timestamp>,
    /// When we last successfully connected
    pub last_success: Option<Timestamp>,
    /// Number of connection attempts
    pub attempts: u32,
    /// Source that told us about this address (/16 subnet key)
    pub source_subnet: SubnetKey,
}

impl AddressEntry {
    /// Create a new address entry
    pub fn new(address: NetworkAddress, now: Timestamp, source_subnet: SubnetKey) -> Self {
        Self {
            first_seen: now,
            last_attempt: None,
            last_success: None,
            attempts: 0,
            source_subnet,
            address,
        }
    }

    /// Subnet of the address itself.
    pub fn subnet(&self) -> SubnetKey {
        SubnetKey::from_ip(&self.address.ip)
    }
}

/// Statistics about the address manager.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressManagerStats {
    /// Number of addresses in the New table.
    pub new_count: usize,
    /// Number of addresses in the Tried table.
    pub tried_count: usize,
    /// Number of buckets in the New table.
    pub new_bucket_count: usize,
    /// Number of buckets in the Tried table.
    pub tried_bucket_count: usize,
}

impl AddressManagerStats {
    pub fn total(&self) -> usize {
        self.new_count + self.tried_count
    }
}
