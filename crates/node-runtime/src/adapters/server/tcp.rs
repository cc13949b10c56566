//! Tokio TCP peer-session server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, trace, warn};

use peer_discovery::{AddressPool, PeerDialer};

use super::{PeerSessionServer, ServerError, ServerFactory, ServerSettings};
use crate::adapters::peer_discovery::SharedAddressManager;
use crate::adapters::storage::{ChainStore, StorageError};
use crate::params::NetworkParams;

const READ_BUFFER_SIZE: usize = 4096;

/// Storage key under which an established outbound peer is recorded.
pub(crate) fn peer_key(addr: &SocketAddr) -> Vec<u8> {
    format!("peer/{}", addr).into_bytes()
}

async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

struct ServerInner {
    local_addr: SocketAddr,
    listener: Mutex<Option<TcpListener>>,
    started: AtomicBool,
    store: Arc<dyn ChainStore>,
    addresses: SharedAddressManager,
    settings: ServerSettings,
    stop_tx: watch::Sender<bool>,
    tasks: Mutex<JoinSet<()>>,
    sessions: AtomicUsize,
}

impl ServerInner {
    fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock();
        // Reap finished tasks so the set does not grow without bound.
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    fn record_peer(&self, addr: &SocketAddr) {
        let seen = self.settings.time_source.now().as_secs();
        match self.store.put(&peer_key(addr), &seen.to_le_bytes()) {
            Ok(()) => trace!(%addr, "Recorded peer"),
            Err(StorageError::Closed) => debug!(%addr, "Chain database closed, peer not recorded"),
            Err(e) => warn!(%addr, error = %e, "Failed to record peer"),
        }
    }
}

/// TCP implementation of [`PeerSessionServer`].
///
/// The listener is bound at construction; sessions only carry bytes, which
/// are drained and discarded.
pub struct TcpPeerServer {
    inner: Arc<ServerInner>,
}

impl TcpPeerServer {
    /// Bind the listener. Failing to bind is a construction error.
    pub async fn bind(
        listen_addr: SocketAddr,
        store: Arc<dyn ChainStore>,
        params: NetworkParams,
        settings: ServerSettings,
    ) -> Result<Self, ServerError> {
        let bind_error = |source| ServerError::Bind {
            addr: listen_addr,
            source,
        };
        let listener = TcpListener::bind(listen_addr).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;
        info!(%local_addr, network = %params.network, "Peer server listening");

        let addresses = SharedAddressManager::new(
            settings.address_manager.clone(),
            Arc::clone(&settings.time_source),
        );
        let (stop_tx, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(ServerInner {
                local_addr,
                listener: Mutex::new(Some(listener)),
                started: AtomicBool::new(false),
                store,
                addresses,
                settings,
                stop_tx,
                tasks: Mutex::new(JoinSet::new()),
                sessions: AtomicUsize::new(0),
            }),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// Sessions currently open, inbound and outbound.
    pub fn session_count(&self) -> usize {
        self.inner.sessions.load(Ordering::SeqCst)
    }

    async fn accept_loop(inner: Arc<ServerInner>, listener: TcpListener) {
        let mut stop = inner.stop_tx.subscribe();
        loop {
            tokio::select! {
                _ = stopped(&mut stop) => {
                    debug!("Accept loop stopping");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        info!(%peer, "Inbound peer connected");
                        let session = Self::session(Arc::clone(&inner), stream, peer.to_string());
                        inner.spawn(session);
                    }
                    Err(e) => warn!(error = %e, "Accept failed"),
                },
            }
        }
    }

    async fn dial(inner: Arc<ServerInner>, endpoint: String, persistent: bool) {
        let mut stop = inner.stop_tx.subscribe();
        let known = endpoint.parse::<SocketAddr>().ok();
        loop {
            if let Some(addr) = &known {
                inner.addresses.mark_attempt(addr);
            }
            let attempt = timeout(
                inner.settings.connect_timeout,
                TcpStream::connect(endpoint.as_str()),
            );
            let result = tokio::select! {
                _ = stopped(&mut stop) => return,
                result = attempt => result,
            };

            match result {
                Ok(Ok(stream)) => {
                    if let Ok(peer) = stream.peer_addr() {
                        inner.addresses.mark_good(&peer);
                        inner.record_peer(&peer);
                    }
                    info!(%endpoint, persistent, "Outbound peer connected");
                    Self::session(Arc::clone(&inner), stream, endpoint.clone()).await;
                }
                Ok(Err(e)) => warn!(%endpoint, error = %e, "Outbound connection failed"),
                Err(_) => warn!(
                    %endpoint,
                    timeout = ?inner.settings.connect_timeout,
                    "Outbound connection timed out"
                ),
            }

            if !persistent || inner.is_stopped() {
                return;
            }
            tokio::select! {
                _ = stopped(&mut stop) => return,
                _ = sleep(inner.settings.persistent_retry_delay) => {
                    debug!(%endpoint, "Retrying persistent peer");
                }
            }
        }
    }

    async fn session(inner: Arc<ServerInner>, mut stream: TcpStream, peer: String) {
        inner.sessions.fetch_add(1, Ordering::SeqCst);
        let mut stop = inner.stop_tx.subscribe();
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        loop {
            tokio::select! {
                _ = stopped(&mut stop) => break,
                read = stream.read(&mut buf) => match read {
                    Ok(0) => {
                        debug!(%peer, "Peer closed the connection");
                        break;
                    }
                    Ok(n) => trace!(%peer, bytes = n, "Received data"),
                    Err(e) => {
                        debug!(%peer, error = %e, "Session read failed");
                        break;
                    }
                },
            }
        }

        let _ = stream.shutdown().await;
        inner.sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PeerDialer for TcpPeerServer {
    fn connect(&self, endpoint: &str, persistent: bool) {
        if self.inner.is_stopped() {
            debug!(%endpoint, "Server stopping, connection not attempted");
            return;
        }
        let dial = Self::dial(Arc::clone(&self.inner), endpoint.to_string(), persistent);
        self.inner.spawn(dial);
    }
}

#[async_trait]
impl PeerSessionServer for TcpPeerServer {
    fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            debug!("Peer server already started");
            return;
        }
        let Some(listener) = self.inner.listener.lock().take() else {
            return;
        };
        let accept = Self::accept_loop(Arc::clone(&self.inner), listener);
        self.inner.spawn(accept);
        info!(local_addr = %self.inner.local_addr, "Peer server started");
    }

    fn shutdown(&self) {
        if !self.inner.stop_tx.send_replace(true) {
            info!("Peer server stopping");
        }
    }

    async fn wait_for_termination(&self) {
        let mut stop = self.inner.stop_tx.subscribe();
        stopped(&mut stop).await;

        loop {
            let mut tasks = std::mem::take(&mut *self.inner.tasks.lock());
            if tasks.is_empty() {
                break;
            }
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    if e.is_panic() {
                        warn!(error = %e, "Peer task panicked");
                    }
                }
            }
        }

        self.inner.listener.lock().take();
        info!("Peer server terminated");
    }

    fn address_pool(&self) -> Arc<dyn AddressPool> {
        Arc::new(self.inner.addresses.clone())
    }

    fn as_dialer(&self) -> &dyn PeerDialer {
        self
    }
}

/// Builds [`TcpPeerServer`]s.
#[derive(Clone)]
pub struct TcpServerFactory {
    settings: ServerSettings,
}

impl TcpServerFactory {
    pub fn new(settings: ServerSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ServerFactory for TcpServerFactory {
    async fn create(
        &self,
        listen_addr: SocketAddr,
        store: Arc<dyn ChainStore>,
        params: NetworkParams,
    ) -> Result<Arc<dyn PeerSessionServer>, ServerError> {
        let server = TcpPeerServer::bind(listen_addr, store, params, self.settings.clone()).await?;
        Ok(Arc::new(server))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryChainStore;
    use crate::params::Network;
    use peer_discovery::{NetworkAddress, ServiceFlags, SystemTimeSource, TimeSource};
    use std::time::Duration;

    fn settings() -> ServerSettings {
        let mut settings = ServerSettings::new(Arc::new(SystemTimeSource::new()));
        settings.connect_timeout = Duration::from_secs(2);
        settings.persistent_retry_delay = Duration::from_millis(20);
        settings
    }

    async fn bind(store: Arc<dyn ChainStore>) -> TcpPeerServer {
        TcpPeerServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            store,
            NetworkParams::for_network(Network::Regtest),
            settings(),
        )
        .await
        .unwrap()
    }

    async fn terminate(server: &TcpPeerServer) {
        server.shutdown();
        timeout(Duration::from_secs(5), server.wait_for_termination())
            .await
            .expect("server did not terminate");
    }

    #[tokio::test]
    async fn test_bind_conflict_is_construction_error() {
        let store: Arc<dyn ChainStore> = Arc::new(MemoryChainStore::new());
        let first = bind(Arc::clone(&store)).await;

        let second = TcpPeerServer::bind(
            first.local_addr(),
            store,
            NetworkParams::for_network(Network::Regtest),
            settings(),
        )
        .await;

        assert!(matches!(second, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_inbound_session_ends_on_shutdown() {
        let server = bind(Arc::new(MemoryChainStore::new())).await;
        server.start();
        server.start();

        let _client = TcpStream::connect(server.local_addr()).await.unwrap();
        for _ in 0..100 {
            if server.session_count() == 1 {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(server.session_count(), 1);

        terminate(&server).await;
        assert_eq!(server.session_count(), 0);
    }

    #[tokio::test]
    async fn test_outbound_peer_is_recorded() {
        let store = Arc::new(MemoryChainStore::new());
        let server = bind(store.clone()).await;
        server.start();

        let remote = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let remote_addr = remote.local_addr().unwrap();
        server.connect(&remote_addr.to_string(), false);
        let (_accepted, _) = timeout(Duration::from_secs(5), remote.accept())
            .await
            .unwrap()
            .unwrap();

        let key = peer_key(&remote_addr);
        let mut recorded = false;
        for _ in 0..100 {
            if store.get(&key).unwrap().is_some() {
                recorded = true;
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert!(recorded);

        terminate(&server).await;
    }

    #[tokio::test]
    async fn test_failed_dial_does_not_block_termination() {
        let server = bind(Arc::new(MemoryChainStore::new())).await;
        server.start();

        // Nothing listens here; the persistent dialer keeps retrying.
        let unused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let target = unused.local_addr().unwrap();
        drop(unused);
        server.connect(&target.to_string(), true);
        sleep(Duration::from_millis(50)).await;

        terminate(&server).await;
    }

    #[tokio::test]
    async fn test_dial_attempts_are_counted() {
        let server = bind(Arc::new(MemoryChainStore::new())).await;
        server.start();

        let unused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let target = unused.local_addr().unwrap();
        drop(unused);

        let seen = SystemTimeSource::new().now().sub_secs(3600);
        let known = NetworkAddress::from_socket_addr(target, seen, ServiceFlags::NODE_NETWORK);
        assert_eq!(server.address_pool().add_addresses(vec![known]), 1);

        server.connect(&target.to_string(), true);

        let attempts = || {
            server
                .inner
                .addresses
                .inner
                .read()
                .get(&target)
                .map(|entry| entry.attempts)
                .unwrap_or(0)
        };
        for _ in 0..100 {
            if attempts() >= 2 {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert!(attempts() >= 2, "attempts: {}", attempts());

        terminate(&server).await;
    }

    #[tokio::test]
    async fn test_connect_after_shutdown_is_ignored() {
        let server = bind(Arc::new(MemoryChainStore::new())).await;
        server.shutdown();

        server.connect("127.0.0.1:1", true);

        assert!(server.inner.tasks.lock().is_empty());
        terminate(&server).await;
    }
}
