//! Interrupt controller.
//!
//! Turns the first termination signal into a single run of the shutdown
//! hook followed by a published shutdown request. Every later signal is
//! logged and ignored.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::shutdown::ShutdownLatch;

/// Stream of received signal names.
pub type SignalStream = mpsc::UnboundedReceiver<&'static str>;

/// Source of termination signals.
pub trait SignalSource: Send {
    /// Install the handlers and start forwarding signals.
    fn listen(self: Box<Self>) -> std::io::Result<SignalStream>;
}

/// Signals fed from an in-process channel.
pub struct ChannelSignals {
    rx: SignalStream,
}

impl ChannelSignals {
    /// Returns the source and the sender used to raise signals.
    pub fn new() -> (Self, mpsc::UnboundedSender<&'static str>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, tx)
    }
}

impl SignalSource for ChannelSignals {
    fn listen(self: Box<Self>) -> std::io::Result<SignalStream> {
        Ok(self.rx)
    }
}

/// Listens for signals until dropped.
pub struct InterruptController {
    listener: JoinHandle<()>,
}

impl InterruptController {
    /// Install the signal handlers and register `on_shutdown`.
    ///
    /// The hook runs on the blocking pool, at most once. The latch moves
    /// to `ShutdownRequested` only after the hook returns.
    pub fn register<F>(
        source: Box<dyn SignalSource>,
        latch: ShutdownLatch,
        on_shutdown: F,
    ) -> std::io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut signals = source.listen()?;

        let listener = tokio::spawn(async move {
            let mut hook = Some(on_shutdown);
            while let Some(signal) = signals.recv().await {
                if !latch.trigger() {
                    info!(signal, "Already shutting down, ignoring signal");
                    continue;
                }

                info!(signal, "Received signal, shutting down");
                if let Some(hook) = hook.take() {
                    if let Err(e) = tokio::task::spawn_blocking(hook).await {
                        error!(error = %e, "Shutdown hook failed");
                    }
                }
                latch.publish_requested();
            }
        });

        Ok(Self { listener })
    }
}

impl Drop for InterruptController {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ShutdownState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct FailingSignals;

    impl SignalSource for FailingSignals {
        fn listen(self: Box<Self>) -> std::io::Result<SignalStream> {
            Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "no signals",
            ))
        }
    }

    fn counting_hook() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let runs = Arc::new(AtomicUsize::new(0));
        let hook_runs = Arc::clone(&runs);
        (runs, move || {
            hook_runs.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_first_signal_runs_hook_then_publishes() {
        let (signals, tx) = ChannelSignals::new();
        let latch = ShutdownLatch::new();
        let (runs, hook) = counting_hook();

        let _controller =
            InterruptController::register(Box::new(signals), latch.clone(), hook).unwrap();
        tx.send("SIGINT").unwrap();

        tokio::time::timeout(Duration::from_secs(1), latch.wait_for_shutdown())
            .await
            .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(latch.state(), ShutdownState::ShutdownRequested);
    }

    #[tokio::test]
    async fn test_repeated_signals_run_hook_once() {
        let (signals, tx) = ChannelSignals::new();
        let latch = ShutdownLatch::new();
        let (runs, hook) = counting_hook();

        let _controller =
            InterruptController::register(Box::new(signals), latch.clone(), hook).unwrap();
        for _ in 0..5 {
            tx.send("SIGTERM").unwrap();
        }

        tokio::time::timeout(Duration::from_secs(1), latch.wait_for_shutdown())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_signal_no_hook() {
        let (signals, _tx) = ChannelSignals::new();
        let latch = ShutdownLatch::new();
        let (runs, hook) = counting_hook();

        let _controller =
            InterruptController::register(Box::new(signals), latch.clone(), hook).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(!latch.is_triggered());
        assert_eq!(latch.state(), ShutdownState::Running);
    }

    #[tokio::test]
    async fn test_install_failure_is_reported() {
        let latch = ShutdownLatch::new();
        let (_, hook) = counting_hook();
        let result = InterruptController::register(Box::new(FailingSignals), latch, hook);
        assert!(result.is_err());
    }
}
