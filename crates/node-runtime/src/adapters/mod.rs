//! # Adapter Implementations
//!
//! Concrete implementations of the ports the lifecycle depends on:
//!
//! - `storage`: chain database backends and the data-directory lock
//! - `server`: the TCP peer-session server
//! - `peer_discovery`: shared address manager behind the `AddressPool` port
//! - `signals`: operating system termination signals

pub mod peer_discovery;
pub mod server;
pub mod signals;
pub mod storage;

pub use peer_discovery::SharedAddressManager;
pub use server::{PeerSessionServer, ServerError, ServerFactory, ServerSettings};
pub use signals::OsSignals;
pub use storage::{ChainStore, StorageBackend, StorageConfig, StorageError, StorageOpener};
