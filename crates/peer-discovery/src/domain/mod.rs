//! # Domain Layer
//!
//! Pure logic for addresses, address bookkeeping and peer selection.
//! Nothing here performs I/O or reads the clock.

pub mod address_manager;
pub mod entities;
pub mod errors;
pub mod peer_selection;

pub use address_manager::{
    secure_bucket_hash, AddressBucket, AddressEntry, AddressManager, AddressManagerConfig,
    AddressManagerStats, AddressTable, SubnetKey,
};
pub use entities::{NetworkAddress, ServiceFlags, Timestamp};
pub use errors::{AddressManagerError, ResolveError};
pub use peer_selection::{InitialPeerList, InitialPeerSet, PeerKind};
