//! Main AddressManager implementation.
//!
//! Reference: Bitcoin Core's `addrman.h`

use std::collections::hash_map::RandomState;
use std::net::{IpAddr, SocketAddr};

use super::config::AddressManagerConfig;
use super::security::{secure_bucket_hash, SubnetKey};
use super::table::AddressTable;
use super::types::{AddressEntry, AddressManagerStats};
use crate::domain::{AddressManagerError, NetworkAddress, Timestamp};

/// Address manager with New/Tried segregation
///
/// # Anti-Eclipse Defense
///
/// 1. New addresses go to New table, bucketed by source+address subnet
/// 2. Only after successful connection do addresses move to Tried table
/// 3. Per-subnet limits prevent flooding from single IP range
#[derive(Debug)]
pub struct AddressManager {
    /// Addresses we've heard about but never connected to
    new_table: AddressTable,
    /// Addresses we've successfully connected to
    tried_table: AddressTable,
    /// Per-process key for bucket placement
    bucket_key: RandomState,
    config: AddressManagerConfig,
}

impl AddressManager {
    pub fn new(config: AddressManagerConfig) -> Self {
        Self {
            new_table: AddressTable::new(config.new_bucket_count),
            tried_table: AddressTable::new(config.tried_bucket_count),
            bucket_key: RandomState::new(),
            config,
        }
    }

    /// Bulk-insert addresses learned from `source_ip`.
    ///
    /// Returns how many were newly added. Invalid, terrible and duplicate
    /// records are skipped.
    pub fn add_addresses<I>(&mut self, addresses: I, source_ip: &IpAddr, now: Timestamp) -> usize
    where
        I: IntoIterator<Item = NetworkAddress>,
    {
        addresses
            .into_iter()
            .filter(|addr| matches!(self.add_new(*addr, source_ip, now), Ok(true)))
            .count()
    }

    /// Add a new address learned from a peer.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the address was placed in the New table
    /// - `Ok(false)` if it was already known, terrible, or its subnet is full
    /// - `Err(InvalidAddress)` if it can never be dialed
    pub fn add_new(
        &mut self,
        address: NetworkAddress,
        source_ip: &IpAddr,
        now: Timestamp,
    ) -> Result<bool, AddressManagerError> {
        let socket_addr = address.socket_addr();
        if !address.is_dialable() {
            return Err(AddressManagerError::InvalidAddress(socket_addr));
        }

        if self.is_terrible(&address, now) {
            return Ok(false);
        }

        let known = self
            .tried_table
            .get_mut(&socket_addr)
            .or_else(|| self.new_table.get_mut(&socket_addr));
        if let Some(entry) = known {
            if address.timestamp > entry.address.timestamp {
                entry.address.timestamp = address.timestamp;
            }
            entry.address.services = entry.address.services | address.services;
            return Ok(false);
        }

        let source_subnet = SubnetKey::from_ip(source_ip);
        let addr_subnet = SubnetKey::from_ip(&address.ip);

        let total_count =
            self.new_table.subnet_total(&addr_subnet) + self.tried_table.subnet_total(&addr_subnet);
        if total_count >= self.config.max_per_subnet_total {
            return Ok(false);
        }

        let bucket_idx = self.calculate_new_bucket(&source_subnet, &addr_subnet);
        if !self.new_table.buckets[bucket_idx].can_accept(&addr_subnet, &self.config) {
            return Ok(false);
        }

        self.new_table
            .insert(bucket_idx, AddressEntry::new(address, now, source_subnet));
        Ok(true)
    }

    /// Promote an address from New to Tried after a successful connection.
    ///
    /// Returns `Ok(false)` if the address is unknown or already tried.
    pub fn mark_good(
        &mut self,
        addr: &SocketAddr,
        now: Timestamp,
    ) -> Result<bool, AddressManagerError> {
        if let Some(entry) = self.tried_table.get_mut(addr) {
            entry.last_success = Some(now);
            return Ok(false);
        }

        let Some(mut entry) = self.new_table.remove(addr) else {
            return Ok(false);
        };
        entry.last_success = Some(now);
        entry.last_attempt = Some(now);
        entry.attempts += 1;

        let tried_bucket_idx = self.calculate_tried_bucket(&entry.address.ip);
        if !self.tried_table.buckets[tried_bucket_idx].can_accept(&entry.subnet(), &self.config)
            && self.tried_table.evict_oldest_in(tried_bucket_idx).is_none()
        {
            return Ok(false);
        }

        self.tried_table.insert(tried_bucket_idx, entry);
        Ok(true)
    }

    /// Record a connection attempt against a known address.
    pub fn mark_attempt(&mut self, addr: &SocketAddr, now: Timestamp) -> bool {
        let entry = match self.tried_table.get_mut(addr) {
            Some(entry) => Some(entry),
            None => self.new_table.get_mut(addr),
        };
        match entry {
            Some(entry) => {
                entry.last_attempt = Some(now);
                entry.attempts = entry.attempts.saturating_add(1);
                true
            }
            None => false,
        }
    }

    /// Records dated too far in the future or older than the horizon.
    pub fn is_terrible(&self, address: &NetworkAddress, now: Timestamp) -> bool {
        if address.timestamp > now.add_secs(self.config.max_future_drift_secs) {
            return true;
        }
        address.timestamp.age_at(now) > self.config.horizon_secs
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.new_table.contains(addr) || self.tried_table.contains(addr)
    }

    pub fn get(&self, addr: &SocketAddr) -> Option<&AddressEntry> {
        self.tried_table
            .get(addr)
            .or_else(|| self.new_table.get(addr))
    }

    pub fn len(&self) -> usize {
        self.new_table.len() + self.tried_table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.new_table.is_empty() && self.tried_table.is_empty()
    }

    /// Get a random address from the New table.
    pub fn random_new_address_with<F>(&self, random_fn: F) -> Option<&AddressEntry>
    where
        F: FnMut(usize) -> usize,
    {
        self.new_table.random_entry_with(random_fn)
    }

    /// Get a random address from the Tried table.
    pub fn random_tried_address_with<F>(&self, random_fn: F) -> Option<&AddressEntry>
    where
        F: FnMut(usize) -> usize,
    {
        self.tried_table.random_entry_with(random_fn)
    }

    pub fn stats(&self) -> AddressManagerStats {
        AddressManagerStats {
            new_count: self.new_table.len(),
            tried_count: self.tried_table.len(),
            new_bucket_count: self.config.new_bucket_count,
            tried_bucket_count: self.config.tried_bucket_count,
        }
    }

    /// New table bucket index from the source and address subnets.
    fn calculate_new_bucket(&self, source_subnet: &SubnetKey, addr_subnet: &SubnetKey) -> usize {
        let hash = secure_bucket_hash(&self.bucket_key, &(source_subnet, addr_subnet));
        (hash as usize) % self.config.new_bucket_count
    }

    fn calculate_tried_bucket(&self, ip: &IpAddr) -> usize {
        let subnet = SubnetKey::from_ip(ip);
        let hash = secure_bucket_hash(&self.bucket_key, &subnet);
        (hash as usize) % self.config.tried_bucket_count
    }
}
