//! Initial peer selection.
//!
//! Operators configure two lists: `connect_peers` (persistent, exclusive)
//! and `add_peers` (opportunistic). Exactly one of them is honored per run.

/// How the connection layer should treat a dialed peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerKind {
    /// Kept connected for the lifetime of the node.
    Persistent,
    /// Dialed once; losing it is not an error.
    Opportunistic,
}

impl PeerKind {
    pub fn is_persistent(&self) -> bool {
        matches!(self, PeerKind::Persistent)
    }
}

/// The operator-configured peer lists, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitialPeerList {
    connect_peers: Vec<String>,
    add_peers: Vec<String>,
}

impl InitialPeerList {
    pub fn new(connect_peers: Vec<String>, add_peers: Vec<String>) -> Self {
        Self {
            connect_peers,
            add_peers,
        }
    }

    /// Pick the list to dial.
    ///
    /// A non-empty `connect_peers` wins outright and `add_peers` is ignored.
    /// The two lists are never merged.
    pub fn select(self) -> InitialPeerSet {
        if self.connect_peers.is_empty() {
            InitialPeerSet {
                endpoints: self.add_peers,
                kind: PeerKind::Opportunistic,
            }
        } else {
            InitialPeerSet {
                endpoints: self.connect_peers,
                kind: PeerKind::Persistent,
            }
        }
    }
}

/// The endpoints chosen for this run, all of one [`PeerKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialPeerSet {
    pub endpoints: Vec<String>,
    pub kind: PeerKind,
}

impl InitialPeerSet {
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }
}
