//! Outbound ports (SPI) for Header Sync.
//!
//! `ChainIndex` and `InFlightIndex` are only ever touched while the
//! chain-state lock is held, so they take `&mut self` and need no
//! internal locking.

use crate::domain::{
    BlockHeader, BlockLocator, ChainWork, Hash, HeaderRecord, HeaderRejection, HeaderSyncError,
    InFlightMark, InventoryItem, PeerId,
};

/// Block-header tree: storage, header validation, ancestry and work.
pub trait ChainIndex: Send {
    /// Validate and store a header.
    ///
    /// Returns the header hash on success, including when the header was
    /// already known and valid.
    fn accept_header(&mut self, header: &BlockHeader) -> Result<Hash, HeaderRejection>;

    /// Look up a header by hash.
    fn record(&self, hash: &Hash) -> Option<HeaderRecord>;

    /// Whether `hash` is known.
    fn contains(&self, hash: &Hash) -> bool {
        self.record(hash).is_some()
    }

    /// Whether `hash` is on the active (best fully-validated) chain.
    fn is_on_active_chain(&self, hash: &Hash) -> bool;

    /// Cumulative work of the active chain tip.
    fn active_tip_work(&self) -> ChainWork;

    /// Header with the most work known, regardless of body availability.
    fn best_header(&self) -> Hash;

    /// Locator starting at `hash`.
    fn locator_for(&self, hash: &Hash) -> BlockLocator;

    /// Best-effort consistency self-check. Violations are reported by the
    /// implementation and never fail header processing.
    fn check_tree_invariants(&self) {}
}

/// Outstanding block-body requests across all peers.
pub trait InFlightIndex: Send {
    /// Whether `hash` is requested from any peer.
    fn is_in_flight(&self, hash: &Hash) -> bool;

    /// Record a block request.
    fn mark_in_flight(&mut self, mark: InFlightMark);

    /// Blocks currently requested from `peer`.
    fn in_flight_count(&self, peer: &PeerId) -> usize;
}

/// Peer network interface for P2P communication.
pub trait PeerNetwork: Send + Sync {
    /// Send message to a specific peer. Never blocks.
    fn send_to_peer(&self, peer: PeerId, message: NetworkMessage) -> Result<(), HeaderSyncError>;
}

/// Network message types produced by header sync.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkMessage {
    /// Request headers following the locator.
    GetHeaders {
        locator: BlockLocator,
        stop_hash: Option<Hash>,
    },
    /// Request block bodies.
    GetData {
        request_id: uuid::Uuid,
        inventory: Vec<InventoryItem>,
    },
}

/// Misbehavior scoring sink. Ban thresholds are applied elsewhere.
pub trait MisbehaviorReporter: Send + Sync {
    /// Add `points` to the peer's misbehavior score.
    fn report_misbehavior(&self, peer: PeerId, points: u32, reason: &str);
}

/// Per-block decision whether to request a body now.
pub trait AnnouncementAdmission: Send + Sync {
    /// Decide whether `hash` should be requested from `peer` now.
    ///
    /// On admission the implementation appends the request to `batch` and
    /// returns `true`. It may reserve capacity as a side effect.
    fn decide(
        &self,
        hash: &Hash,
        peer: PeerId,
        in_flight: &dyn InFlightIndex,
        batch: &mut Vec<InventoryItem>,
    ) -> bool;
}
