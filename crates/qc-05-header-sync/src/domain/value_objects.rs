//! Value objects for header synchronisation state.

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};

use super::{Hash, PeerId};

/// Bounded run of locally absent ancestors of a header.
///
/// Hashes are kept oldest first (nearest the active chain). When the
/// window is full, the newest entry is evicted so that the retained
/// entries always start at the point where the gap connects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MissingAncestorWindow {
    hashes: VecDeque<Hash>,
    capacity: usize,
}

impl MissingAncestorWindow {
    /// Creates an empty window holding at most `capacity` hashes.
    pub fn new(capacity: usize) -> Self {
        Self {
            hashes: VecDeque::with_capacity(capacity.saturating_add(1)),
            capacity,
        }
    }

    /// Records an ancestor discovered while walking away from the tip.
    ///
    /// Every call is older than all previous calls, so it goes in front;
    /// on overflow the newest entry (back) is dropped.
    pub fn push_older(&mut self, hash: Hash) {
        self.hashes.push_front(hash);
        if self.hashes.len() > self.capacity {
            self.hashes.pop_back();
        }
    }

    /// Drops everything (walk aborted).
    pub fn clear(&mut self) {
        self.hashes.clear();
    }

    /// Hashes ordered from nearest the active chain to nearest the tip.
    pub fn iter(&self) -> impl Iterator<Item = &Hash> + '_ {
        self.hashes.iter()
    }

    /// Hashes ordered from nearest the active chain to nearest the tip.
    pub fn to_vec(&self) -> Vec<Hash> {
        self.hashes.iter().copied().collect()
    }

    /// Whether `hash` is in the window.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.hashes.contains(hash)
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Window is empty.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

/// Per-peer header synchronisation state.
///
/// Lives for the duration of the connection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerHeaderState {
    /// Unconnecting header announcements since the last successful batch.
    pub unconnecting_headers: u32,
    /// Best header we know the peer has (known to our chain index).
    pub best_known_header: Option<Hash>,
    /// Last announced hash that was not in our chain index at the time.
    pub last_unknown_block: Option<Hash>,
    /// Height the peer reported at handshake.
    pub starting_height: u64,
}

impl PeerHeaderState {
    /// Creates state for a peer that reported `starting_height` at handshake.
    pub fn new(starting_height: u64) -> Self {
        Self {
            starting_height,
            ..Self::default()
        }
    }

    /// Counts one more unconnecting announcement.
    ///
    /// Returns `true` when the count reaches a multiple of `period`,
    /// i.e. when the peer should be penalised.
    pub fn record_unconnecting(&mut self, period: u32) -> bool {
        self.unconnecting_headers = self.unconnecting_headers.saturating_add(1);
        period != 0 && self.unconnecting_headers % period == 0
    }

    /// A batch connected: the peer is not feeding us orphans.
    pub fn reset_unconnecting(&mut self) {
        self.unconnecting_headers = 0;
    }
}

/// Registry of per-peer header state.
///
/// Each connection's messages are serialised by the transport; the lock
/// here only protects the map itself and same-peer races.
#[derive(Debug, Default)]
pub struct PeerStates {
    peers: RwLock<HashMap<PeerId, PeerHeaderState>>,
}

impl PeerStates {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a peer after handshake.
    pub fn on_peer_connected(&self, peer: PeerId, starting_height: u64) {
        self.peers
            .write()
            .insert(peer, PeerHeaderState::new(starting_height));
    }

    /// Forgets a peer; a reconnect starts from a clean state.
    pub fn on_peer_disconnected(&self, peer: &PeerId) {
        self.peers.write().remove(peer);
    }

    /// Snapshot of a peer's state.
    pub fn get(&self, peer: &PeerId) -> Option<PeerHeaderState> {
        self.peers.read().get(peer).cloned()
    }

    /// Runs `f` against the peer's state, creating it on first use.
    pub fn with_peer<F, R>(&self, peer: PeerId, f: F) -> R
    where
        F: FnOnce(&mut PeerHeaderState) -> R,
    {
        let mut peers = self.peers.write();
        f(peers.entry(peer).or_default())
    }

    /// Number of tracked peers.
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// No peers tracked.
    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}
