//! Operating system termination signals.

use tokio::sync::mpsc;

use crate::lifecycle::{SignalSource, SignalStream};

/// SIGINT and SIGTERM on unix, Ctrl-C elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSignals;

impl OsSignals {
    pub fn new() -> Self {
        Self
    }
}

impl SignalSource for OsSignals {
    #[cfg(unix)]
    fn listen(self: Box<Self>) -> std::io::Result<SignalStream> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                let name = tokio::select! {
                    Some(()) = sigint.recv() => "SIGINT",
                    Some(()) = sigterm.recv() => "SIGTERM",
                    else => break,
                };
                if tx.send(name).is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }

    #[cfg(not(unix))]
    fn listen(self: Box<Self>) -> std::io::Result<SignalStream> {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if tx.send("Ctrl-C").is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}
