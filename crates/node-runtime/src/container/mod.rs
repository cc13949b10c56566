//! # Collaborator Container
//!
//! Everything [`crate::lifecycle::run`] talks to, injected as trait
//! objects. [`NodeCollaborators::production`] wires the real adapters;
//! tests substitute fakes field by field.

pub mod config;

use std::sync::Arc;

use peer_discovery::{SeedResolver, SystemSeedResolver, SystemTimeSource, TimeSource};

use crate::adapters::server::{ServerFactory, ServerSettings, TcpServerFactory};
use crate::adapters::signals::OsSignals;
use crate::adapters::storage::{DefaultStorageOpener, StorageOpener};
use crate::lifecycle::{ShutdownLatch, SignalSource};

pub use config::{
    normalize_endpoint, CliOverrides, ConfigError, LoggingConfig, NetworkConfig, NodeConfig,
};

/// Injected dependencies of one node run.
pub struct NodeCollaborators {
    pub storage: Arc<dyn StorageOpener>,
    pub servers: Arc<dyn ServerFactory>,
    pub resolver: Arc<dyn SeedResolver>,
    pub signals: Box<dyn SignalSource>,
    pub time_source: Arc<dyn TimeSource>,
    pub latch: ShutdownLatch,
}

impl NodeCollaborators {
    /// Real storage, TCP server, system resolver and OS signals.
    pub fn production(config: &NodeConfig) -> Self {
        let time_source: Arc<dyn TimeSource> = Arc::new(SystemTimeSource::new());

        let mut settings = ServerSettings::new(Arc::clone(&time_source));
        settings.connect_timeout = config.network.connect_timeout;
        settings.persistent_retry_delay = config.network.persistent_retry_delay;

        Self {
            storage: Arc::new(DefaultStorageOpener),
            servers: Arc::new(TcpServerFactory::new(settings)),
            resolver: Arc::new(SystemSeedResolver::new()),
            signals: Box::new(OsSignals::new()),
            time_source,
            latch: ShutdownLatch::new(),
        }
    }
}
