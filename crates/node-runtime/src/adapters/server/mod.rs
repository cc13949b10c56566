//! # Peer-Session Server
//!
//! Owns peer connections. The lifecycle constructs one through a
//! [`ServerFactory`], starts it, dials the initial peers through it and
//! blocks on [`PeerSessionServer::wait_for_termination`].

mod tcp;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use peer_discovery::{AddressManagerConfig, AddressPool, PeerDialer, TimeSource};

use crate::adapters::storage::ChainStore;
use crate::params::NetworkParams;

pub use tcp::{TcpPeerServer, TcpServerFactory};

/// Server construction errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// A running peer-session server.
#[async_trait]
pub trait PeerSessionServer: PeerDialer {
    /// Begin accepting sessions. Idempotent and non-blocking.
    fn start(&self);

    /// Ask every session and the accept loop to stop.
    fn shutdown(&self);

    /// Resolve once stopped, every session has ended, and no further
    /// storage writes will be issued.
    async fn wait_for_termination(&self);

    /// The address pool this server draws outbound candidates from.
    fn address_pool(&self) -> Arc<dyn AddressPool>;

    fn as_dialer(&self) -> &dyn PeerDialer;
}

/// Builds the server for a run.
#[async_trait]
pub trait ServerFactory: Send + Sync {
    async fn create(
        &self,
        listen_addr: SocketAddr,
        store: Arc<dyn ChainStore>,
        params: NetworkParams,
    ) -> Result<Arc<dyn PeerSessionServer>, ServerError>;
}

/// Tuning for the TCP server.
#[derive(Clone)]
pub struct ServerSettings {
    pub connect_timeout: Duration,
    /// Delay between attempts to a persistent peer.
    pub persistent_retry_delay: Duration,
    pub address_manager: AddressManagerConfig,
    pub time_source: Arc<dyn TimeSource>,
}

impl ServerSettings {
    pub fn new(time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            persistent_retry_delay: Duration::from_secs(5),
            address_manager: AddressManagerConfig::default(),
            time_source,
        }
    }
}
