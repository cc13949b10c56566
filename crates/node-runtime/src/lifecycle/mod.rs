//! Node lifecycle: startup sequencing and shutdown coordination.

pub mod interrupt;
pub mod orchestrator;
pub mod shutdown;

pub use interrupt::{ChannelSignals, InterruptController, SignalSource, SignalStream};
pub use orchestrator::{exit_code, run, StartupError};
pub use shutdown::{ShutdownLatch, ShutdownState, StorageGuard};
