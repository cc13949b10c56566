//! # Address Manager - New/Tried Bucket System
//!
//! Pool of known peer addresses, in the style of Bitcoin's `addrman`.
//!
//! - **New Table**: addresses heard about (seeds, gossip) but never connected to
//! - **Tried Table**: addresses we have successfully connected to
//!
//! ## Anti-Eclipse Properties
//!
//! 1. Per-subnet bucketing prevents IP flooding attacks
//! 2. Segregation prevents poisoning Tried with unverified addresses
//! 3. Source-based bucketing distributes gossip across buckets
//! 4. Future-dated and stale records are refused on insertion
//!
//! Reference: Bitcoin Core's `addrman.h`

mod bucket;
mod config;
mod manager;
mod security;
mod table;
mod types;

pub use bucket::AddressBucket;
pub use config::AddressManagerConfig;
pub use manager::AddressManager;
pub use security::{secure_bucket_hash, SubnetKey};
pub use table::AddressTable;
pub use types::{AddressEntry, AddressManagerStats};
