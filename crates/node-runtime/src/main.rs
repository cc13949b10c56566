//! # Node Runtime
//!
//! Entry point for the full node.
//!
//! ## Startup Sequence
//!
//! 1. Install logging at the default level
//! 2. Load configuration (defaults, TOML file, `NODE_*` environment, flags)
//! 3. Build a multi-threaded runtime with one worker per CPU
//! 4. Run the node lifecycle until shutdown
//!
//! The exit code is zero after a clean or signaled shutdown and nonzero
//! on any fatal startup error.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

use node_runtime::container::{CliOverrides, NodeCollaborators, NodeConfig};
use node_runtime::lifecycle;
use node_runtime::logging::{self, DEFAULT_LOG_LEVEL};
use node_runtime::params::Network;

/// P2P full node.
#[derive(Parser, Debug)]
#[command(name = "node-runtime")]
#[command(version, about = "Bootstrap, peer discovery and shutdown for a P2P full node")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short = 'C', long = "configfile")]
    config: Option<PathBuf>,

    /// Network to join (mainnet, testnet, regtest)
    #[arg(long)]
    network: Option<Network>,

    /// Logging level or filter directives
    #[arg(short = 'd', long = "debuglevel")]
    debug_level: Option<String>,

    /// Directory to store data
    #[arg(short = 'b', long = "datadir")]
    data_dir: Option<PathBuf>,

    /// Connect only to the specified peers (repeatable)
    #[arg(long = "connect")]
    connect: Vec<String>,

    /// Add a peer to connect with at startup (repeatable)
    #[arg(short = 'a', long = "addpeer")]
    add_peer: Vec<String>,

    /// Disable DNS seeding for peers
    #[arg(long = "nodnsseed")]
    no_dns_seed: bool,

    /// Port to listen on for inbound peers
    #[arg(long = "listenport")]
    listen_port: Option<u16>,

    /// SOCKS5 proxy (host:port)
    #[arg(long)]
    proxy: Option<SocketAddr>,

    /// Resolve DNS seeds through the proxy
    #[arg(long = "usetor")]
    use_tor: bool,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            network: self.network,
            data_dir: self.data_dir.clone(),
            debug_level: self.debug_level.clone(),
            connect_peers: self.connect.clone(),
            add_peers: self.add_peer.clone(),
            disable_dns_seed: self.no_dns_seed,
            listen_port: self.listen_port,
            proxy: self.proxy,
            use_tor: self.use_tor,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let (logging, _log_guard) = match logging::init(DEFAULT_LOG_LEVEL) {
        Ok(installed) => installed,
        Err(e) => {
            eprintln!("failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match try_main(&args, &logging) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn try_main(args: &Args, logging: &logging::LoggingHandle) -> Result<ExitCode> {
    let config = NodeConfig::load(args.config.as_deref(), &args.overrides())
        .context("failed to load configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("node-worker")
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let result = runtime.block_on(async {
        let collaborators = NodeCollaborators::production(&config);
        lifecycle::run(config, collaborators, logging).await
    });

    if let Err(e) = &result {
        error!(error = %e, "Node startup failed");
    }
    Ok(lifecycle::exit_code(&result))
}
