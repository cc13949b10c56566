//! In-memory chain store.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::{ChainStore, DataDirLock, StorageError};

#[derive(Debug, Default)]
struct MemoryState {
    open: bool,
    committed: HashMap<Vec<u8>, Vec<u8>>,
    staged: HashMap<Vec<u8>, Vec<u8>>,
    lock: Option<DataDirLock>,
}

/// Chain store kept in process memory.
///
/// Follows the same staged-write model as the persistent backends so the
/// shutdown paths behave identically.
#[derive(Debug)]
pub struct MemoryChainStore {
    state: Mutex<MemoryState>,
}

impl MemoryChainStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                open: true,
                ..MemoryState::default()
            }),
        }
    }

    /// Open while holding a data directory lock until release.
    pub fn with_lock(lock: DataDirLock) -> Self {
        let store = Self::new();
        store.state.lock().lock = Some(lock);
        store
    }

    /// Number of committed keys.
    pub fn committed_len(&self) -> usize {
        self.state.lock().committed.len()
    }

    /// Number of staged, uncommitted keys.
    pub fn staged_len(&self) -> usize {
        self.state.lock().staged.len()
    }
}

impl Default for MemoryChainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainStore for MemoryChainStore {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(StorageError::Closed);
        }
        state.staged.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let state = self.state.lock();
        if !state.open {
            return Err(StorageError::Closed);
        }
        Ok(state
            .staged
            .get(key)
            .or_else(|| state.committed.get(key))
            .cloned())
    }

    fn flush(&self) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(StorageError::Closed);
        }
        let staged = std::mem::take(&mut state.staged);
        state.committed.extend(staged);
        Ok(())
    }

    fn close(&self) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(StorageError::Closed);
        }
        let staged = std::mem::take(&mut state.staged);
        state.committed.extend(staged);
        state.open = false;
        state.lock = None;
        Ok(())
    }

    fn rollback_close(&self) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(StorageError::Closed);
        }
        state.staged.clear();
        state.open = false;
        state.lock = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }
}
