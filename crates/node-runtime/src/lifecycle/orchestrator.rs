//! # Lifecycle Orchestrator
//!
//! Sequences one node run:
//!
//! 1. apply the configured log level
//! 2. open the chain database
//! 3. register the shutdown hook
//! 4. construct the peer-session server
//! 5. start it
//! 6. seed the address pool from DNS
//! 7. dispatch the initial peers
//! 8. wait for termination, then close the database
//!
//! Stages 1-4 are fatal on failure. Stages 6 and 7 only log. A signal at
//! any point skips the remaining stages and goes straight to the close
//! path; the database is released exactly once on every path.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use peer_discovery::{
    AddressPool, ConnectionOrchestrator, DiscoveryConfig, SeedDiscovery, SeedResolver,
    TimeSource,
};

use super::interrupt::InterruptController;
use super::shutdown::{ShutdownLatch, StorageGuard};
use crate::adapters::server::ServerError;
use crate::adapters::storage::StorageError;
use crate::container::{NodeCollaborators, NodeConfig};
use crate::logging::{LevelControl, LoggingError};
use crate::params::NetworkParams;

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid debug level: {0}")]
    Logging(#[from] LoggingError),

    #[error("unable to open chain database: {0}")]
    Storage(#[source] StorageError),

    #[error("unable to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),

    #[error("unable to start server on {addr}: {source}")]
    Server {
        addr: SocketAddr,
        #[source]
        source: ServerError,
    },
}

/// Process exit code for the result of [`run`].
pub fn exit_code(result: &Result<(), StartupError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

/// Run the node until it terminates.
pub async fn run(
    config: NodeConfig,
    collaborators: NodeCollaborators,
    logging: &dyn LevelControl,
) -> Result<(), StartupError> {
    let NodeCollaborators {
        storage,
        servers,
        resolver,
        signals,
        time_source,
        latch,
    } = collaborators;

    logging.set_level(&config.logging.debug_level)?;

    let params = config.network_params();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        network = %params.network,
        "Starting node"
    );

    let store = storage
        .open(&config.storage, &params)
        .map_err(StartupError::Storage)?;
    let guard = Arc::new(StorageGuard::new(store));

    let hook_guard = Arc::clone(&guard);
    let _interrupts = match InterruptController::register(signals, latch.clone(), move || {
        rollback(&hook_guard)
    }) {
        Ok(controller) => controller,
        Err(e) => {
            release(&guard, &latch).await;
            return Err(StartupError::Signals(e));
        }
    };

    if latch.is_triggered() {
        info!("Shutdown requested during startup");
        release(&guard, &latch).await;
        return Ok(());
    }

    let listen_addr = config.listen_addr(&params);
    let server = match servers
        .create(listen_addr, guard.store(), params.clone())
        .await
    {
        Ok(server) => server,
        Err(source) => {
            release(&guard, &latch).await;
            return Err(StartupError::Server {
                addr: listen_addr,
                source,
            });
        }
    };

    let stopper = {
        let server = Arc::clone(&server);
        let latch = latch.clone();
        tokio::spawn(async move {
            latch.wait_for_shutdown().await;
            server.shutdown();
        })
    };

    if !latch.is_triggered() {
        server.start();
    }

    if !latch.is_triggered() {
        if config.network.disable_dns_seed {
            info!("DNS seeding disabled");
        } else {
            let seeding = seed_address_pool(
                &config,
                &params,
                resolver,
                time_source,
                server.address_pool(),
            );
            tokio::select! {
                () = seeding => {}
                () = latch.wait_for_shutdown() => info!("DNS seeding interrupted by shutdown"),
            }
        }
    }

    if !latch.is_triggered() {
        ConnectionOrchestrator::new(server.as_dialer()).dispatch(config.initial_peers());
    }

    server.wait_for_termination().await;
    stopper.abort();
    info!("Peer server stopped");

    release(&guard, &latch).await;
    Ok(())
}

/// Resolve the DNS seeds and hand the result to the pool in one call.
async fn seed_address_pool(
    config: &NodeConfig,
    params: &NetworkParams,
    resolver: Arc<dyn SeedResolver>,
    time_source: Arc<dyn TimeSource>,
    pool: Arc<dyn AddressPool>,
) {
    let discovery = SeedDiscovery::new(
        resolver,
        time_source,
        DiscoveryConfig {
            seeds: params.dns_seeds.clone(),
            proxy: config.network.seed_proxy(),
            default_port: params.default_port,
            resolve_timeout: config.network.dns_timeout,
        },
    );

    let mut addresses = discovery.discover().await;
    if addresses.is_empty() && !config.network.seed_fallback_peers.is_empty() {
        warn!(
            count = config.network.seed_fallback_peers.len(),
            "DNS seeds returned no addresses, using fallback peers"
        );
        addresses = discovery.age_endpoints(
            config.network.seed_fallback_peers.iter().copied(),
            &mut rand::thread_rng(),
        );
    }

    let offered = addresses.len();
    let added = pool.add_addresses(addresses);
    info!(offered, added, "Seeded address pool");
}

/// Shutdown hook body.
fn rollback(guard: &StorageGuard) {
    match guard.rollback_close() {
        Ok(true) => info!("Chain database rolled back and closed"),
        Ok(false) => debug!("Chain database already released"),
        Err(e) => error!(error = %e, "Failed to roll back chain database"),
    }
}

/// Close path shared by every exit.
async fn release(guard: &StorageGuard, latch: &ShutdownLatch) {
    if latch.is_triggered() {
        // The hook owns the release once a signal has been claimed.
        latch.wait_for_shutdown().await;
    }
    match guard.close() {
        Ok(true) => info!("Chain database closed"),
        Ok(false) => debug!("Chain database already released"),
        Err(e) => error!(error = %e, "Failed to close chain database"),
    }
    latch.mark_terminated();
}
