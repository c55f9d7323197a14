//! # Header Sync Configuration
//!
//! Limits that bound direct fetch and DoS accounting for header messages.

use serde::{Deserialize, Serialize};

/// Blocks requested from one peer via direct fetch at a time.
pub const MAX_BLOCKS_IN_TRANSIT_PER_PEER: usize = 16;

/// Ancestors examined before giving up on direct fetch (one day of blocks).
pub const DIRECT_FETCH_WALK_LIMIT: usize = 144;

/// Unconnecting announcements per misbehavior penalty.
pub const MAX_UNCONNECTING_HEADERS: u32 = 10;

/// Headers per message; a full message means the peer may have more.
pub const MAX_HEADERS_RESULTS: usize = 2000;

/// Longest headers message still treated as a possible announcement.
pub const MAX_BLOCKS_TO_ANNOUNCE: usize = 8;

/// Header sync configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderSyncConfig {
    /// Per-peer cap on direct-fetch block requests.
    pub max_blocks_in_transit_per_peer: usize,

    /// Maximum ancestors examined by the missing-block walk.
    pub direct_fetch_walk_limit: usize,

    /// Every N-th unconnecting announcement is penalised.
    pub max_unconnecting_headers: u32,

    /// Penalty for a broken parent link inside a batch.
    pub invalid_sequence_penalty: u32,

    /// Penalty applied every `max_unconnecting_headers` announcements.
    pub unconnecting_penalty: u32,

    /// Penalty for a headers message above `max_headers_results`.
    pub oversized_message_penalty: u32,

    /// Maximum headers per message.
    pub max_headers_results: usize,

    /// Messages at most this long may be announcements.
    pub max_blocks_to_announce: usize,

    /// Run the full block-tree self-check after every headers message.
    /// Linear in tree size; meant for tests and debugging.
    pub check_tree_invariants: bool,
}

impl Default for HeaderSyncConfig {
    fn default() -> Self {
        Self {
            max_blocks_in_transit_per_peer: MAX_BLOCKS_IN_TRANSIT_PER_PEER,
            direct_fetch_walk_limit: DIRECT_FETCH_WALK_LIMIT,
            max_unconnecting_headers: MAX_UNCONNECTING_HEADERS,
            invalid_sequence_penalty: 20,
            unconnecting_penalty: 20,
            oversized_message_penalty: 20,
            max_headers_results: MAX_HEADERS_RESULTS,
            max_blocks_to_announce: MAX_BLOCKS_TO_ANNOUNCE,
            check_tree_invariants: false,
        }
    }
}

impl HeaderSyncConfig {
    /// Create a config for testing (smaller values).
    pub fn for_testing() -> Self {
        Self {
            max_blocks_in_transit_per_peer: 10,
            max_headers_results: 50,
            check_tree_invariants: true,
            ..Self::default()
        }
    }
}
