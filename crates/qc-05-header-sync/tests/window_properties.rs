//! Property tests for the missing-ancestor window and download selection.

use std::collections::HashSet;

use proptest::prelude::*;
use qc_05_header_sync::domain::{
    invariant_requested_prefix, invariant_window_bounded, invariant_window_unique,
};
use qc_05_header_sync::{
    find_missing_blocks, select_downloads, AnnouncementAdmission, BlockHeader, ChainIndex, Hash,
    InFlightIndex, InventoryItem, MemoryChainIndex, MemoryInFlightIndex, MissingAncestorWindow,
    PeerId,
};

const EASY_BITS: u32 = 0x207f_ffff;

/// Admits everything except a fixed set of positions.
struct Declines(HashSet<Hash>);

impl AnnouncementAdmission for Declines {
    fn decide(
        &self,
        hash: &Hash,
        _peer: PeerId,
        _in_flight: &dyn InFlightIndex,
        batch: &mut Vec<InventoryItem>,
    ) -> bool {
        if self.0.contains(hash) {
            return false;
        }
        batch.push(InventoryItem::block(*hash));
        true
    }
}

fn window_of(len: usize, cap: usize) -> MissingAncestorWindow {
    let mut window = MissingAncestorWindow::new(cap);
    for n in (0..len).rev() {
        let mut hash = [0u8; 32];
        hash[..8].copy_from_slice(&(n as u64).to_be_bytes());
        window.push_older(hash);
    }
    window
}

proptest! {
    #[test]
    fn requested_set_is_window_prefix(
        len in 0usize..40,
        cap in 1usize..20,
        declined in proptest::collection::vec(any::<bool>(), 40),
    ) {
        let window = window_of(len, cap);
        let entries = window.to_vec();
        let declines: HashSet<Hash> = entries
            .iter()
            .zip(declined.iter())
            .filter(|(_, d)| **d)
            .map(|(h, _)| *h)
            .collect();
        let mut in_flight = MemoryInFlightIndex::new();
        let peer = PeerId::new([1u8; 32]);

        let request = select_downloads(&window, peer, &Declines(declines.clone()), &mut in_flight);

        prop_assert!(invariant_requested_prefix(&entries, &request.requested));
        let first_decline = entries
            .iter()
            .position(|h| declines.contains(h))
            .unwrap_or(entries.len());
        prop_assert_eq!(request.requested.len(), first_decline);
        prop_assert_eq!(in_flight.in_flight_count(&peer), first_decline);
    }

    #[test]
    fn window_keeps_oldest_entries(len in 0usize..60, cap in 1usize..20) {
        let window = window_of(len, cap);
        prop_assert!(invariant_window_unique(&window));
        prop_assert!(invariant_window_bounded(&window, cap));
        prop_assert_eq!(window.to_vec(), window_of(len.min(cap), cap).to_vec());
    }

    #[test]
    fn walk_returns_gap_nearest_active_chain(gap in 1usize..60, cap in 1usize..20) {
        let genesis = BlockHeader::new([0u8; 32], 0, EASY_BITS, 0);
        let mut chain = MemoryChainIndex::new(&genesis);
        let mut prev = chain.genesis();
        let mut hashes = Vec::with_capacity(gap);
        for i in 0..gap {
            let header = BlockHeader::new(prev, i as u32 + 1, EASY_BITS, i as u32);
            prev = chain.accept_header(&header).unwrap();
            hashes.push(prev);
        }

        let window = find_missing_blocks(&chain, &MemoryInFlightIndex::new(), &prev, cap, 144);

        let expected: Vec<Hash> = hashes.iter().take(cap).copied().collect();
        prop_assert_eq!(window.to_vec(), expected);
    }
}
