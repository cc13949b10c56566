//! Address table implementation.

use std::collections::HashMap;
use std::net::SocketAddr;

use super::bucket::AddressBucket;
use super::security::SubnetKey;
use super::types::AddressEntry;

/// A table of buckets (either New or Tried)
#[derive(Debug)]
pub struct AddressTable {
    pub(crate) buckets: Vec<AddressBucket>,
    /// Total entries per subnet across all buckets
    pub(crate) subnet_totals: HashMap<SubnetKey, usize>,
    /// Quick lookup: socket address -> bucket index
    pub(crate) addr_to_bucket: HashMap<SocketAddr, usize>,
}

impl AddressTable {
    pub fn new(bucket_count: usize) -> Self {
        Self {
            buckets: (0..bucket_count).map(|_| AddressBucket::new()).collect(),
            subnet_totals: HashMap::new(),
            addr_to_bucket: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.addr_to_bucket.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addr_to_bucket.is_empty()
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.addr_to_bucket.contains_key(addr)
    }

    pub fn subnet_total(&self, subnet: &SubnetKey) -> usize {
        self.subnet_totals.get(subnet).copied().unwrap_or(0)
    }

    pub fn get(&self, addr: &SocketAddr) -> Option<&AddressEntry> {
        let idx = *self.addr_to_bucket.get(addr)?;
        self.buckets[idx]
            .entries()
            .iter()
            .find(|e| &e.address.socket_addr() == addr)
    }

    pub fn get_mut(&mut self, addr: &SocketAddr) -> Option<&mut AddressEntry> {
        let idx = *self.addr_to_bucket.get(addr)?;
        self.buckets[idx].get_mut(addr)
    }

    /// Insert into a specific bucket, keeping the indexes in step.
    pub(crate) fn insert(&mut self, bucket_idx: usize, entry: AddressEntry) {
        let addr = entry.address.socket_addr();
        *self.subnet_totals.entry(entry.subnet()).or_insert(0) += 1;
        self.buckets[bucket_idx].add(entry);
        self.addr_to_bucket.insert(addr, bucket_idx);
    }

    pub(crate) fn remove(&mut self, addr: &SocketAddr) -> Option<AddressEntry> {
        let idx = self.addr_to_bucket.remove(addr)?;
        let entry = self.buckets[idx].remove(addr)?;
        self.forget_subnet(&entry.subnet());
        Some(entry)
    }

    pub(crate) fn evict_oldest_in(&mut self, bucket_idx: usize) -> Option<AddressEntry> {
        let evicted = self.buckets[bucket_idx].evict_oldest()?;
        self.addr_to_bucket.remove(&evicted.address.socket_addr());
        self.forget_subnet(&evicted.subnet());
        Some(evicted)
    }

    fn forget_subnet(&mut self, subnet: &SubnetKey) {
        if let Some(count) = self.subnet_totals.get_mut(subnet) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.subnet_totals.remove(subnet);
            }
        }
    }

    /// Get a random entry from the table using an injected random index.
    ///
    /// `random_fn(n)` must return a value in `0..n`; larger values wrap.
    pub fn random_entry_with<F>(&self, mut random_fn: F) -> Option<&AddressEntry>
    where
        F: FnMut(usize) -> usize,
    {
        let total = self.len();
        if total == 0 {
            return None;
        }

        let mut remaining = random_fn(total) % total;
        for bucket in &self.buckets {
            let bucket_len = bucket.len();
            if remaining < bucket_len {
                return bucket.get_entry(remaining);
            }
            remaining -= bucket_len;
        }

        None
    }
}
