//! # Chain Storage Adapters
//!
//! The node's chain database behind the [`ChainStore`] trait.
//!
//! ## Write model
//!
//! Writes are staged. They become durable on `flush` or `close`;
//! `rollback_close` discards everything staged since the last flush and
//! releases the database without committing it.
//!
//! ## Backends
//!
//! - `memory` - in-process map, the default
//! - `rocksdb` - RocksDB, enabled with the `rocksdb` feature
//!
//! Both take an exclusive lock on the data directory before opening.

mod lock;
mod memory;

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

pub use lock::DataDirLock;
pub use memory::MemoryChainStore;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{RocksDbChainStore, RocksDbConfig};

use crate::params::NetworkParams;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("chain database is closed")]
    Closed,

    #[error("data directory {} is in use by another process", path.display())]
    Locked { path: PathBuf },

    #[error("storage I/O error: {message}")]
    Io { message: String },

    #[error("storage backend `{0}` is not compiled into this binary")]
    BackendUnavailable(StorageBackend),
}

/// The node's chain database.
pub trait ChainStore: Send + Sync {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Make every staged write durable.
    fn flush(&self) -> Result<(), StorageError>;

    /// Commit staged writes and release the database.
    fn close(&self) -> Result<(), StorageError>;

    /// Discard staged writes and release the database.
    fn rollback_close(&self) -> Result<(), StorageError>;

    fn is_open(&self) -> bool;
}

/// Available backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    RocksDb,
}

impl Default for StorageBackend {
    fn default() -> Self {
        if cfg!(feature = "rocksdb") {
            StorageBackend::RocksDb
        } else {
            StorageBackend::Memory
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => f.write_str("memory"),
            StorageBackend::RocksDb => f.write_str("rocksdb"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "rocksdb" => Ok(StorageBackend::RocksDb),
            other => Err(format!("unknown storage backend `{}`", other)),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Root data directory; each network gets its own subdirectory.
    pub data_dir: PathBuf,
    pub backend: StorageBackend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            backend: StorageBackend::default(),
        }
    }
}

impl StorageConfig {
    /// Directory holding the chain database for `params`' network.
    pub fn network_dir(&self, params: &NetworkParams) -> PathBuf {
        self.data_dir.join(params.network.name())
    }
}

/// Opens the chain database. Injected into the lifecycle so tests can fail
/// or observe the open.
pub trait StorageOpener: Send + Sync {
    fn open(
        &self,
        config: &StorageConfig,
        params: &NetworkParams,
    ) -> Result<Arc<dyn ChainStore>, StorageError>;
}

/// Opens the configured backend under the per-network data directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStorageOpener;

impl StorageOpener for DefaultStorageOpener {
    fn open(
        &self,
        config: &StorageConfig,
        params: &NetworkParams,
    ) -> Result<Arc<dyn ChainStore>, StorageError> {
        let dir = config.network_dir(params);
        let lock = DataDirLock::acquire(&dir)?;
        let store = open_backend(config.backend, &dir, lock)?;
        info!(backend = %config.backend, path = %dir.display(), "Chain database opened");
        Ok(store)
    }
}

#[cfg(feature = "rocksdb")]
fn open_backend(
    backend: StorageBackend,
    dir: &Path,
    lock: DataDirLock,
) -> Result<Arc<dyn ChainStore>, StorageError> {
    match backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryChainStore::with_lock(lock))),
        StorageBackend::RocksDb => {
            let config = RocksDbConfig::new(dir.join("chain"));
            Ok(Arc::new(RocksDbChainStore::open(config, lock)?))
        }
    }
}

#[cfg(not(feature = "rocksdb"))]
fn open_backend(
    backend: StorageBackend,
    _dir: &Path,
    lock: DataDirLock,
) -> Result<Arc<dyn ChainStore>, StorageError> {
    match backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryChainStore::with_lock(lock))),
        StorageBackend::RocksDb => Err(StorageError::BackendUnavailable(backend)),
    }
}
