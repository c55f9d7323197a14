//! In-memory index of outstanding block requests.

use std::collections::HashMap;

use crate::domain::{Hash, InFlightMark, PeerId};
use crate::ports::InFlightIndex;

/// Tracks which blocks are requested from which peer.
#[derive(Debug, Default)]
pub struct MemoryInFlightIndex {
    marks: HashMap<Hash, InFlightMark>,
    per_peer: HashMap<PeerId, usize>,
}

impl MemoryInFlightIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark for `hash`, if requested.
    pub fn get(&self, hash: &Hash) -> Option<&InFlightMark> {
        self.marks.get(hash)
    }

    /// The block arrived (or the request timed out).
    pub fn complete(&mut self, hash: &Hash) -> Option<InFlightMark> {
        let mark = self.marks.remove(hash)?;
        self.release(&mark.peer);
        Some(mark)
    }

    /// Drop every request to a disconnected peer, returning the hashes
    /// that need to be requested elsewhere.
    pub fn clear_peer(&mut self, peer: &PeerId) -> Vec<Hash> {
        let hashes: Vec<Hash> = self
            .marks
            .values()
            .filter(|m| m.peer == *peer)
            .map(|m| m.hash)
            .collect();
        for hash in &hashes {
            self.marks.remove(hash);
        }
        self.per_peer.remove(peer);
        hashes
    }

    /// Total outstanding requests.
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    fn release(&mut self, peer: &PeerId) {
        if let Some(count) = self.per_peer.get_mut(peer) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.per_peer.remove(peer);
            }
        }
    }
}

impl InFlightIndex for MemoryInFlightIndex {
    fn is_in_flight(&self, hash: &Hash) -> bool {
        self.marks.contains_key(hash)
    }

    fn mark_in_flight(&mut self, mark: InFlightMark) {
        let peer = mark.peer;
        if let Some(previous) = self.marks.insert(mark.hash, mark) {
            self.release(&previous.peer);
        }
        *self.per_peer.entry(peer).or_default() += 1;
    }

    fn in_flight_count(&self, peer: &PeerId) -> usize {
        self.per_peer.get(peer).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use uuid::Uuid;

    fn mark(peer: u8, hash: u8) -> InFlightMark {
        InFlightMark {
            peer: PeerId::new([peer; 32]),
            hash: [hash; 32],
            requested_at: Instant::now(),
            request_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_mark_and_complete() {
        let mut index = MemoryInFlightIndex::new();
        index.mark_in_flight(mark(1, 10));
        index.mark_in_flight(mark(1, 11));

        assert!(index.is_in_flight(&[10u8; 32]));
        assert_eq!(index.in_flight_count(&PeerId::new([1u8; 32])), 2);

        let done = index.complete(&[10u8; 32]).unwrap();
        assert_eq!(done.peer, PeerId::new([1u8; 32]));
        assert_eq!(index.in_flight_count(&PeerId::new([1u8; 32])), 1);
        assert!(index.complete(&[10u8; 32]).is_none());
    }

    #[test]
    fn test_remark_moves_request_between_peers() {
        let mut index = MemoryInFlightIndex::new();
        index.mark_in_flight(mark(1, 10));
        index.mark_in_flight(mark(2, 10));

        assert_eq!(index.len(), 1);
        assert_eq!(index.in_flight_count(&PeerId::new([1u8; 32])), 0);
        assert_eq!(index.in_flight_count(&PeerId::new([2u8; 32])), 1);
    }

    #[test]
    fn test_clear_peer() {
        let mut index = MemoryInFlightIndex::new();
        index.mark_in_flight(mark(1, 10));
        index.mark_in_flight(mark(1, 11));
        index.mark_in_flight(mark(2, 12));

        let mut freed = index.clear_peer(&PeerId::new([1u8; 32]));
        freed.sort();
        assert_eq!(freed, vec![[10u8; 32], [11u8; 32]]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.in_flight_count(&PeerId::new([1u8; 32])), 0);
    }
}
