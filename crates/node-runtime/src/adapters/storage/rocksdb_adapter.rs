//! # RocksDB Storage Adapter
//!
//! RocksDB implementation of [`ChainStore`].
//!
//! ## Features
//!
//! - Staged writes committed atomically as one `WriteBatch`
//! - Snappy compression
//! - Bloom filters for read optimization
//! - fsync on commit for durability

use std::path::PathBuf;

use parking_lot::{Mutex, RwLock};
use rocksdb::{Options, WriteBatch, WriteOptions, DB};

use super::{ChainStore, DataDirLock, StorageError};

/// RocksDB configuration
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: PathBuf,
    /// Block cache size in bytes (default: 256MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 64MB)
    pub write_buffer_size: usize,
    /// Maximum number of write buffers (default: 3)
    pub max_write_buffer_number: i32,
    /// Enable fsync on commit (default: true for durability)
    pub sync_writes: bool,
}

impl RocksDbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 256 * 1024 * 1024, // 256MB
            write_buffer_size: 64 * 1024 * 1024, // 64MB
            max_write_buffer_number: 3,
            sync_writes: true,
        }
    }

    /// Create config for testing (smaller buffers, no sync)
    pub fn for_testing(path: impl Into<PathBuf>) -> Self {
        Self {
            block_cache_size: 8 * 1024 * 1024,  // 8MB
            write_buffer_size: 4 * 1024 * 1024, // 4MB
            max_write_buffer_number: 2,
            sync_writes: false,
            ..Self::new(path)
        }
    }
}

fn io_error(context: &str, e: rocksdb::Error) -> StorageError {
    StorageError::Io {
        message: format!("RocksDB {} failed: {}", context, e),
    }
}

/// RocksDB-backed chain store.
///
/// The database handle is dropped on release, which closes RocksDB.
pub struct RocksDbChainStore {
    db: RwLock<Option<DB>>,
    staged: Mutex<Vec<(Vec<u8>, Vec<u8>)>>,
    lock: Mutex<Option<DataDirLock>>,
    config: RocksDbConfig,
}

impl RocksDbChainStore {
    /// Open or create the database; `lock` is held until release.
    pub fn open(config: RocksDbConfig, lock: DataDirLock) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        // Performance tuning
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);

        // Compression
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        // Bloom filter for faster lookups
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, &config.path).map_err(|e| io_error("open", e))?;

        Ok(Self {
            db: RwLock::new(Some(db)),
            staged: Mutex::new(Vec::new()),
            lock: Mutex::new(Some(lock)),
            config,
        })
    }

    fn commit(&self, db: &DB) -> Result<(), StorageError> {
        let staged = std::mem::take(&mut *self.staged.lock());
        if staged.is_empty() {
            return Ok(());
        }

        let mut batch = WriteBatch::default();
        for (key, value) in &staged {
            batch.put(key, value);
        }

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        db.write_opt(batch, &write_opts)
            .map_err(|e| io_error("batch write", e))
    }

    fn release(&self, commit: bool) -> Result<(), StorageError> {
        let db = self.db.write().take().ok_or(StorageError::Closed)?;
        let result = if commit {
            self.commit(&db).and_then(|()| db.flush().map_err(|e| io_error("flush", e)))
        } else {
            self.staged.lock().clear();
            Ok(())
        };
        drop(db);
        self.lock.lock().take();
        result
    }
}

impl ChainStore for RocksDbChainStore {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        if self.db.read().is_none() {
            return Err(StorageError::Closed);
        }
        self.staged.lock().push((key.to_vec(), value.to_vec()));
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let db = self.db.read();
        let db = db.as_ref().ok_or(StorageError::Closed)?;

        let staged = self
            .staged
            .lock()
            .iter()
            .rev()
            .find(|(k, _)| k.as_slice() == key)
            .map(|(_, v)| v.clone());
        if staged.is_some() {
            return Ok(staged);
        }

        db.get(key).map_err(|e| io_error("get", e))
    }

    fn flush(&self) -> Result<(), StorageError> {
        let db = self.db.read();
        let db = db.as_ref().ok_or(StorageError::Closed)?;
        self.commit(db)
    }

    fn close(&self) -> Result<(), StorageError> {
        self.release(true)
    }

    fn rollback_close(&self) -> Result<(), StorageError> {
        self.release(false)
    }

    fn is_open(&self) -> bool {
        self.db.read().is_some()
    }
}
