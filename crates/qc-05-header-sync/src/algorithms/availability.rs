//! # Peer Block Availability
//!
//! Tracks the best header each peer is known to have.

use crate::domain::{Hash, PeerHeaderState};
use crate::ports::ChainIndex;

/// Resolve a previously unknown announcement now that our index may know it.
pub fn process_block_availability<C: ChainIndex + ?Sized>(state: &mut PeerHeaderState, chain: &C) {
    let Some(unknown) = state.last_unknown_block else {
        return;
    };

    if let Some(record) = chain.record(&unknown) {
        if !record.chain_work.is_zero() {
            let best_work = state
                .best_known_header
                .and_then(|best| chain.record(&best))
                .map(|best| best.chain_work);
            if best_work.map_or(true, |work| record.chain_work >= work) {
                state.best_known_header = Some(unknown);
            }
        }
        state.last_unknown_block = None;
    }
}

/// The peer has `hash`. Update its best known header, or remember the
/// hash until our index learns about it.
pub fn update_block_availability<C: ChainIndex + ?Sized>(
    state: &mut PeerHeaderState,
    hash: &Hash,
    chain: &C,
) {
    process_block_availability(state, chain);

    match chain.record(hash) {
        Some(record) if !record.chain_work.is_zero() => {
            let best_work = state
                .best_known_header
                .and_then(|best| chain.record(&best))
                .map(|best| best.chain_work);
            if best_work.map_or(true, |work| record.chain_work >= work) {
                state.best_known_header = Some(*hash);
            }
        }
        _ => state.last_unknown_block = Some(*hash),
    }
}
