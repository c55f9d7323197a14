//! # QC-05 Header Sync
//!
//! Header acceptance and direct block fetch for the P2P layer.
//!
//! **Subsystem ID:** 5
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Turns untrusted, peer-supplied header batches into:
//! - validated extensions of the local block tree
//! - misbehavior reports against the sending peer
//! - requests for the block bodies needed to follow an announced tip
//!
//! ## Processing
//!
//! ```text
//! headers ──→ [HeaderAcceptor] ──→ peer availability ──→ [continuation getheaders]
//!                   │
//!                   └─ announcement + work gate ──→ [MissingAncestorWalk]
//!                                                          │
//!                                                          ↓
//!                                                  [DownloadSelection] ──→ getdata
//! ```
//!
//! Headers whose parent is unknown never reach the acceptor; they trigger a
//! `getheaders` from the peer's best known header, and every tenth one
//! costs the peer penalty points.
//!
//! ## Concurrency
//!
//! The chain index and the in-flight index sit behind one lock
//! ([`ChainState`]) held for the whole accept, walk and select sequence,
//! so two peers announcing the same tip never both request the same block.
//!
//! ## Module Structure
//!
//! ```text
//! qc-05-header-sync/
//! ├── domain/          # Headers, records, windows, peer state, errors
//! ├── algorithms/      # Acceptance, ancestor walk, download selection
//! ├── ports/           # API traits (inbound) + collaborator traits (outbound)
//! ├── adapters/        # In-memory chain index, in-flight index, admission
//! ├── application/     # HeaderProcessor orchestrating everything
//! └── config.rs        # HeaderSyncConfig
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{
    MemoryChainIndex, MemoryInFlightIndex, MisbehaviorReport, RecordingMisbehavior,
    RecordingNetwork, TransitCapAdmission,
};
pub use algorithms::{
    accept_headers, find_missing_blocks, has_equal_or_more_work, select_downloads,
    update_block_availability, DownloadRequest,
};
pub use application::{ChainState, HeaderProcessor};
pub use config::HeaderSyncConfig;
pub use domain::{
    BlockHeader, BlockLocator, ChainWork, Hash, HeaderRecord, HeaderRejection, HeaderSyncError,
    InFlightMark, InventoryItem, MissingAncestorWindow, PeerHeaderState, PeerId, PeerStates,
};
pub use ports::{
    AnnouncementAdmission, ChainIndex, HeaderSyncApi, InFlightIndex, MisbehaviorReporter,
    NetworkMessage, PeerNetwork,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
