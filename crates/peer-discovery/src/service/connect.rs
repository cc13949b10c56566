//! Initial connection dispatch.

use tracing::{debug, info};

use crate::domain::{InitialPeerList, InitialPeerSet};
use crate::ports::PeerDialer;

/// Hands the selected initial peers to a [`PeerDialer`].
///
/// Dispatch is fire-and-forget: every `connect` returns immediately and
/// connection failures never surface here.
pub struct ConnectionOrchestrator<'a> {
    dialer: &'a dyn PeerDialer,
}

impl<'a> ConnectionOrchestrator<'a> {
    pub fn new(dialer: &'a dyn PeerDialer) -> Self {
        Self { dialer }
    }

    /// Select the list to honor and dial each endpoint once.
    pub fn dispatch(&self, peers: InitialPeerList) -> InitialPeerSet {
        let selected = peers.select();
        let persistent = selected.kind.is_persistent();

        for endpoint in &selected.endpoints {
            debug!(%endpoint, persistent, "Dispatching connection");
            self.dialer.connect(endpoint, persistent);
        }

        if !selected.is_empty() {
            info!(
                count = selected.len(),
                persistent, "Dispatched initial peer connections"
            );
        }
        selected
    }
}
