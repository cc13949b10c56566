//! Address bucket implementation.

use std::collections::HashMap;
use std::net::SocketAddr;

use super::config::AddressManagerConfig;
use super::security::SubnetKey;
use super::types::AddressEntry;

/// A bucket containing address entries with subnet limits
#[derive(Debug, Clone, Default)]
pub struct AddressBucket {
    pub(crate) entries: Vec<AddressEntry>,
    /// Count of entries per subnet in this bucket
    pub(crate) subnet_counts: HashMap<SubnetKey, usize>,
}

impl AddressBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if bucket can accept an entry from given subnet
    pub fn can_accept(&self, subnet: &SubnetKey, config: &AddressManagerConfig) -> bool {
        if self.entries.len() >= config.bucket_size {
            return false;
        }
        let subnet_count = self.subnet_counts.get(subnet).copied().unwrap_or(0);
        subnet_count < config.max_per_subnet_per_bucket
    }

    pub fn add(&mut self, entry: AddressEntry) {
        *self.subnet_counts.entry(entry.subnet()).or_insert(0) += 1;
        self.entries.push(entry);
    }

    pub fn get_mut(&mut self, addr: &SocketAddr) -> Option<&mut AddressEntry> {
        self.entries
            .iter_mut()
            .find(|e| &e.address.socket_addr() == addr)
    }

    pub fn remove(&mut self, addr: &SocketAddr) -> Option<AddressEntry> {
        let pos = self
            .entries
            .iter()
            .position(|e| &e.address.socket_addr() == addr)?;
        Some(self.take_at(pos))
    }

    pub fn entries(&self) -> &[AddressEntry] {
        &self.entries
    }

    pub fn get_entry(&self, index: usize) -> Option<&AddressEntry> {
        self.entries.get(index)
    }

    /// Evict the entry with the oldest `last_success`; never-connected entries go first.
    pub fn evict_oldest(&mut self) -> Option<AddressEntry> {
        let oldest_idx = self
            .entries
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| e.last_success.map(|t| t.as_secs()).unwrap_or(0))
            .map(|(idx, _)| idx)?;
        Some(self.take_at(oldest_idx))
    }

    fn take_at(&mut self, index: usize) -> AddressEntry {
        let entry = self.entries.remove(index);
        let subnet = entry.subnet();
        if let Some(count) = self.subnet_counts.get_mut(&subnet) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.subnet_counts.remove(&subnet);
            }
        }
        entry
    }
}
