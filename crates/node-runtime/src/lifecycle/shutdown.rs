//! Shutdown latch and single-release storage guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, warn};

use crate::adapters::storage::{ChainStore, StorageError};

/// Process shutdown state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    ShutdownRequested,
    Terminated,
}

struct LatchInner {
    triggered: AtomicBool,
    state: watch::Sender<ShutdownState>,
}

/// Shared between the interrupt controller and the lifecycle.
///
/// `trigger` is claimed by the first signal. The state moves to
/// `ShutdownRequested` only after the shutdown hook has finished, so
/// anything waiting on it observes a completed rollback.
#[derive(Clone)]
pub struct ShutdownLatch {
    inner: Arc<LatchInner>,
}

impl ShutdownLatch {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ShutdownState::Running);
        Self {
            inner: Arc::new(LatchInner {
                triggered: AtomicBool::new(false),
                state,
            }),
        }
    }

    /// Claim the shutdown. Returns true for exactly one caller.
    pub fn trigger(&self) -> bool {
        self.inner
            .triggered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::Acquire)
    }

    /// Move `Running` to `ShutdownRequested`; no effect in any other state.
    pub fn publish_requested(&self) {
        self.inner.state.send_if_modified(|state| {
            if *state == ShutdownState::Running {
                *state = ShutdownState::ShutdownRequested;
                true
            } else {
                false
            }
        });
    }

    pub fn mark_terminated(&self) {
        self.inner.state.send_replace(ShutdownState::Terminated);
    }

    pub fn state(&self) -> ShutdownState {
        *self.inner.state.borrow()
    }

    /// Resolve once the state has left `Running`.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.inner.state.subscribe();
        let _ = rx
            .wait_for(|state| *state != ShutdownState::Running)
            .await;
    }
}

impl Default for ShutdownLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the chain store and releases it through exactly one of
/// `close` or `rollback_close`, whichever is called first.
pub struct StorageGuard {
    store: Arc<dyn ChainStore>,
    released: AtomicBool,
}

impl StorageGuard {
    pub fn new(store: Arc<dyn ChainStore>) -> Self {
        Self {
            store,
            released: AtomicBool::new(false),
        }
    }

    /// Handle for components that write to the store.
    pub fn store(&self) -> Arc<dyn ChainStore> {
        Arc::clone(&self.store)
    }

    fn claim(&self) -> bool {
        self.released
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Commit and close. `Ok(false)` if already released.
    pub fn close(&self) -> Result<bool, StorageError> {
        if !self.claim() {
            return Ok(false);
        }
        self.store.close().map(|()| true)
    }

    /// Discard staged writes and close. `Ok(false)` if already released.
    pub fn rollback_close(&self) -> Result<bool, StorageError> {
        if !self.claim() {
            return Ok(false);
        }
        self.store.rollback_close().map(|()| true)
    }
}

impl Drop for StorageGuard {
    fn drop(&mut self) {
        if !self.claim() {
            return;
        }
        match self.store.close() {
            Ok(()) => warn!("Chain database released by guard drop"),
            Err(e) => error!(error = %e, "Failed to close chain database on drop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryChainStore;
    use std::time::Duration;

    #[test]
    fn test_trigger_claimed_once() {
        let latch = ShutdownLatch::new();
        assert!(latch.trigger());
        assert!(!latch.trigger());
        assert!(latch.clone().is_triggered());
    }

    #[test]
    fn test_state_transitions() {
        let latch = ShutdownLatch::new();
        assert_eq!(latch.state(), ShutdownState::Running);

        latch.publish_requested();
        assert_eq!(latch.state(), ShutdownState::ShutdownRequested);

        latch.mark_terminated();
        latch.publish_requested();
        assert_eq!(latch.state(), ShutdownState::Terminated);
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_wakes_on_publish() {
        let latch = ShutdownLatch::new();
        let waiter = {
            let latch = latch.clone();
            tokio::spawn(async move { latch.wait_for_shutdown().await })
        };

        latch.publish_requested();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_close_then_rollback_releases_once() {
        let store = Arc::new(MemoryChainStore::new());
        let guard = StorageGuard::new(store.clone());
        store.put(b"k", b"v").unwrap();

        assert!(guard.close().unwrap());
        assert!(!guard.rollback_close().unwrap());
        assert_eq!(store.committed_len(), 1);
    }

    #[test]
    fn test_rollback_then_close_releases_once() {
        let store = Arc::new(MemoryChainStore::new());
        let guard = StorageGuard::new(store.clone());
        store.put(b"k", b"v").unwrap();

        assert!(guard.rollback_close().unwrap());
        assert!(!guard.close().unwrap());
        assert_eq!(store.committed_len(), 0);
    }

    #[test]
    fn test_drop_closes_unreleased_store() {
        let store = Arc::new(MemoryChainStore::new());
        drop(StorageGuard::new(store.clone()));
        assert!(!store.is_open());
    }

    #[test]
    fn test_concurrent_release_happens_once() {
        let store = Arc::new(MemoryChainStore::new());
        let guard = Arc::new(StorageGuard::new(store));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let guard = Arc::clone(&guard);
                std::thread::spawn(move || {
                    if i % 2 == 0 {
                        guard.close().unwrap()
                    } else {
                        guard.rollback_close().unwrap()
                    }
                })
            })
            .collect();

        let released = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|released| *released)
            .count();
        assert_eq!(released, 1);
    }
}
