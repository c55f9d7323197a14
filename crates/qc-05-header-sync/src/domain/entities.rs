//! # Core Domain Entities
//!
//! Defines the data that flows through header synchronisation.
//!
//! ## Entities
//!
//! - [`BlockHeader`]: Wire header as received from a peer
//! - [`HeaderRecord`]: Chain index view of an accepted header
//! - [`BlockLocator`]: Compact summary of chain positions for `getheaders`
//! - [`InventoryItem`]: Entry of a `getdata` request
//! - [`InFlightMark`]: Outstanding body request bookkeeping
//! - [`PeerId`]: 32-byte peer identifier

use primitive_types::U256;
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Instant;
use uuid::Uuid;

/// Hash type alias (32-byte double SHA-256).
pub type Hash = [u8; 32];

/// Cumulative proof-of-work from genesis to a header.
pub type ChainWork = U256;

/// Hex rendering of the first 8 bytes, for logs and error messages.
pub fn short_hex(bytes: &[u8]) -> String {
    hex::encode(&bytes[..bytes.len().min(8)])
}

/// Block header as received on the wire.
///
/// The hash is never transmitted; it is always derived from the fields,
/// so a peer cannot attach a forged hash to a header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    /// Header format version.
    pub version: u32,
    /// Hash of the parent header.
    pub prev_hash: Hash,
    /// Merkle root of the block's transactions.
    pub merkle_root: Hash,
    /// Unix timestamp (seconds).
    pub timestamp: u32,
    /// Compact difficulty target.
    pub bits: u32,
    /// Proof-of-work nonce.
    pub nonce: u32,
}

impl BlockHeader {
    /// Serialized header size in bytes.
    pub const SIZE: usize = 80;

    /// Creates a header with an empty merkle root.
    pub fn new(prev_hash: Hash, timestamp: u32, bits: u32, nonce: u32) -> Self {
        Self {
            version: 1,
            prev_hash,
            merkle_root: [0u8; 32],
            timestamp,
            bits,
            nonce,
        }
    }

    /// Serializes the header in its 80-byte wire layout.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..36].copy_from_slice(&self.prev_hash);
        out[36..68].copy_from_slice(&self.merkle_root);
        out[68..72].copy_from_slice(&self.timestamp.to_le_bytes());
        out[72..76].copy_from_slice(&self.bits.to_le_bytes());
        out[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        out
    }

    /// Header hash: SHA-256(SHA-256(serialized header)).
    pub fn hash(&self) -> Hash {
        let first = Sha256::digest(self.to_bytes());
        let second = Sha256::digest(first);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&second);
        hash
    }
}

/// Validation status flags of a header known to the chain index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockStatus {
    /// Full block body is stored locally.
    pub has_data: bool,
    /// Header and all of its ancestors passed header-tree validation.
    pub valid_tree: bool,
    /// Header or one of its ancestors was found invalid.
    pub failed: bool,
}

/// Chain index view of an accepted header.
///
/// The parent is referenced by hash, never by pointer; walking ancestry
/// always goes back through the index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderRecord {
    /// Header hash.
    pub hash: Hash,
    /// Parent hash (all zeroes for genesis).
    pub prev_hash: Hash,
    /// Height above genesis.
    pub height: u64,
    /// Cumulative work up to and including this header.
    pub chain_work: ChainWork,
    /// Header timestamp.
    pub timestamp: u32,
    /// Status flags.
    pub status: BlockStatus,
}

impl HeaderRecord {
    /// Parent hash, `None` for genesis.
    pub fn parent(&self) -> Option<Hash> {
        if self.height == 0 {
            None
        } else {
            Some(self.prev_hash)
        }
    }

    /// Body is available locally.
    pub fn has_data(&self) -> bool {
        self.status.has_data
    }

    /// Header tree is fully valid up to this header.
    pub fn is_valid_tree(&self) -> bool {
        self.status.valid_tree && !self.status.failed
    }
}

/// Block locator: hashes from a starting header back to genesis,
/// dense near the start and exponentially sparse further back.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockLocator {
    /// Locator hashes, newest first.
    pub hashes: Vec<Hash>,
}

impl BlockLocator {
    /// Creates a locator from hashes ordered newest first.
    pub fn new(hashes: Vec<Hash>) -> Self {
        Self { hashes }
    }

    /// Newest locator entry.
    pub fn first(&self) -> Option<&Hash> {
        self.hashes.first()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Locator has no entries.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

/// Inventory kind carried by `getdata`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InventoryKind {
    /// Full block.
    Block,
}

/// Single `getdata` entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InventoryItem {
    /// What is requested.
    pub kind: InventoryKind,
    /// Hash of the requested object.
    pub hash: Hash,
}

impl InventoryItem {
    /// Block inventory entry.
    pub fn block(hash: Hash) -> Self {
        Self {
            kind: InventoryKind::Block,
            hash,
        }
    }
}

/// Bookkeeping for an outstanding block body request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InFlightMark {
    /// Peer the block was requested from.
    pub peer: PeerId,
    /// Requested block.
    pub hash: Hash,
    /// When the request was issued.
    pub requested_at: Instant,
    /// Id of the `getdata` message carrying the request.
    pub request_id: Uuid,
}

/// Peer identifier for P2P network communication.
///
/// A 32-byte identifier derived from the peer's public key.
///
/// # Example
///
/// ```rust
/// use qc_05_header_sync::PeerId;
///
/// let peer = PeerId::new([0xAB; 32]);
/// let peer_from_bytes = PeerId::from_bytes(&[0xAB; 32]).unwrap();
/// assert_eq!(peer, peer_from_bytes);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub [u8; 32]);

impl PeerId {
    /// Creates a new peer ID from a 32-byte array.
    pub fn new(id: [u8; 32]) -> Self {
        Self(id)
    }

    /// Creates a peer ID from a byte slice.
    ///
    /// Returns `None` if the slice is shorter than 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() >= 32 {
            let mut id = [0u8; 32];
            id.copy_from_slice(&bytes[..32]);
            Some(Self(id))
        } else {
            None
        }
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&short_hex(&self.0))
    }
}
