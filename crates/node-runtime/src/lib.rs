//! # Node Runtime Library
//!
//! Bootstrap, peer discovery and shutdown for a P2P full node. The binary
//! in `main.rs` loads [`NodeConfig`], installs logging and hands both to
//! [`lifecycle::run`].
//!
//! ## Modules
//!
//! - `params` - per-network constants (magic, default port, DNS seeds)
//! - `container` - configuration and injected collaborators
//! - `adapters` - storage, TCP peer server, address pool, OS signals
//! - `lifecycle` - startup sequencing, interrupt controller, shutdown latch
//! - `logging` - reloadable `tracing` subscriber

#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod container;
pub mod lifecycle;
pub mod logging;
pub mod params;

pub use container::{CliOverrides, ConfigError, NodeCollaborators, NodeConfig};
pub use lifecycle::{exit_code, run, ShutdownLatch, ShutdownState, StartupError};
pub use params::{Network, NetworkParams};
