//! Fakes for driving `lifecycle::run` without sockets, signals or disks.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use node_runtime::adapters::server::{PeerSessionServer, ServerError, ServerFactory};
use node_runtime::adapters::storage::{ChainStore, StorageConfig, StorageError, StorageOpener};
use node_runtime::container::{NodeCollaborators, NodeConfig};
use node_runtime::lifecycle::{ChannelSignals, ShutdownLatch};
use node_runtime::logging::{self, LevelControl, LoggingError};
use node_runtime::params::NetworkParams;
use peer_discovery::test_utils::{FixedTimeSource, MockSeedResolver, RecordingAddressPool, RecordingDialer};
use peer_discovery::{AddressPool, PeerDialer};

pub const NOW: u64 = 1_700_000_000;

pub fn ip(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(a, b, c, d))
}

/// Default config with the seed list replaced.
pub fn config_with_seeds(seeds: &[&str]) -> NodeConfig {
    let mut config = NodeConfig::default();
    config.network.dns_seeds = Some(seeds.iter().map(|s| s.to_string()).collect());
    config
}

// ===== STORAGE =====

#[derive(Default)]
pub struct RecordingStore {
    pub closes: AtomicUsize,
    pub rollbacks: AtomicUsize,
    pub puts: AtomicUsize,
    closed: AtomicBool,
}

impl RecordingStore {
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }
}

impl ChainStore for RecordingStore {
    fn put(&self, _key: &[u8], _value: &[u8]) -> Result<(), StorageError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StorageError::Closed);
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get(&self, _key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(None)
    }

    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn close(&self) -> Result<(), StorageError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn rollback_close(&self) -> Result<(), StorageError> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

pub struct RecordingOpener {
    pub store: Arc<RecordingStore>,
    pub opens: AtomicUsize,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RecordingStore::default()),
            opens: AtomicUsize::new(0),
        }
    }
}

impl StorageOpener for RecordingOpener {
    fn open(
        &self,
        _config: &StorageConfig,
        _params: &NetworkParams,
    ) -> Result<Arc<dyn ChainStore>, StorageError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(self.store.clone())
    }
}

pub struct FailingOpener;

impl StorageOpener for FailingOpener {
    fn open(
        &self,
        config: &StorageConfig,
        _params: &NetworkParams,
    ) -> Result<Arc<dyn ChainStore>, StorageError> {
        Err(StorageError::Locked {
            path: config.data_dir.clone(),
        })
    }
}

// ===== SERVER =====

pub struct FakeServer {
    pub dialer: RecordingDialer,
    pub pool: Arc<RecordingAddressPool>,
    pub starts: AtomicUsize,
    pub shutdowns: AtomicUsize,
    /// When false, `wait_for_termination` blocks until `shutdown`.
    auto_terminate: bool,
    stop: watch::Sender<bool>,
}

impl FakeServer {
    pub fn new(auto_terminate: bool) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            dialer: RecordingDialer::new(),
            pool: Arc::new(RecordingAddressPool::new()),
            starts: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
            auto_terminate,
            stop,
        }
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl PeerDialer for FakeServer {
    fn connect(&self, endpoint: &str, persistent: bool) {
        self.dialer.connect(endpoint, persistent);
    }
}

#[async_trait]
impl PeerSessionServer for FakeServer {
    fn start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.stop.send_replace(true);
    }

    async fn wait_for_termination(&self) {
        if self.auto_terminate {
            return;
        }
        let mut rx = self.stop.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    fn address_pool(&self) -> Arc<dyn AddressPool> {
        self.pool.clone()
    }

    fn as_dialer(&self) -> &dyn PeerDialer {
        self
    }
}

pub struct FakeServerFactory {
    pub server: Arc<FakeServer>,
    pub created: Mutex<Vec<SocketAddr>>,
    fail: bool,
}

impl FakeServerFactory {
    pub fn new(server: FakeServer) -> Self {
        Self {
            server: Arc::new(server),
            created: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(FakeServer::new(true))
        }
    }

    pub fn created(&self) -> Vec<SocketAddr> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServerFactory for FakeServerFactory {
    async fn create(
        &self,
        listen_addr: SocketAddr,
        _store: Arc<dyn ChainStore>,
        _params: NetworkParams,
    ) -> Result<Arc<dyn PeerSessionServer>, ServerError> {
        self.created.lock().unwrap().push(listen_addr);
        if self.fail {
            return Err(ServerError::Bind {
                addr: listen_addr,
                source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
            });
        }
        Ok(self.server.clone())
    }
}

// ===== LOGGING =====

/// Validates levels like the real handle and records what was applied.
#[derive(Default)]
pub struct RecordingLevels {
    pub applied: Mutex<Vec<String>>,
}

impl LevelControl for RecordingLevels {
    fn set_level(&self, level: &str) -> Result<(), LoggingError> {
        logging::parse_directives(level)?;
        self.applied.lock().unwrap().push(level.to_string());
        Ok(())
    }
}

// ===== HARNESS =====

pub struct Harness {
    pub opener: Arc<RecordingOpener>,
    pub factory: Arc<FakeServerFactory>,
    pub resolver: Arc<MockSeedResolver>,
    pub latch: ShutdownLatch,
    pub levels: RecordingLevels,
}

impl Harness {
    pub fn new(resolver: MockSeedResolver, server: FakeServer) -> Self {
        Self {
            opener: Arc::new(RecordingOpener::new()),
            factory: Arc::new(FakeServerFactory::new(server)),
            resolver: Arc::new(resolver),
            latch: ShutdownLatch::new(),
            levels: RecordingLevels::default(),
        }
    }

    /// Collaborators plus the sender for raising signals.
    pub fn collaborators(&self) -> (NodeCollaborators, mpsc::UnboundedSender<&'static str>) {
        let (signals, tx) = ChannelSignals::new();
        let collaborators = NodeCollaborators {
            storage: self.opener.clone(),
            servers: self.factory.clone(),
            resolver: self.resolver.clone(),
            signals: Box::new(signals),
            time_source: Arc::new(FixedTimeSource::new(NOW)),
            latch: self.latch.clone(),
        };
        (collaborators, tx)
    }

    pub fn server(&self) -> &FakeServer {
        &self.factory.server
    }

    pub fn store(&self) -> &RecordingStore {
        &self.opener.store
    }
}
