//! In-memory block-header tree.
//!
//! Keyed store `hash -> HeaderRecord` with parents held as hash keys.
//! Nothing here owns a pointer into the tree, so records can be looked up
//! and walked without lifetime coupling.

use primitive_types::U256;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, error};

use crate::domain::{
    short_hex, BlockHeader, BlockLocator, BlockStatus, ChainWork, Hash, HeaderRecord,
    HeaderRejection,
};
use crate::ports::ChainIndex;

/// Locator entries taken one block apart before spacing doubles.
const LOCATOR_DENSE_ENTRIES: usize = 10;

/// Expand a compact `bits` target.
///
/// Returns `None` for negative, zero or overflowing targets.
pub fn target_from_compact(bits: u32) -> Option<U256> {
    let exponent = bits >> 24;
    let mantissa = bits & 0x007f_ffff;

    if bits & 0x0080_0000 != 0 && mantissa != 0 {
        return None;
    }
    if mantissa != 0
        && (exponent > 34
            || (mantissa > 0xff && exponent > 33)
            || (mantissa > 0xffff && exponent > 32))
    {
        return None;
    }

    let target = if exponent <= 3 {
        U256::from(mantissa >> (8 * (3 - exponent)))
    } else {
        U256::from(mantissa) << (8 * (exponent - 3) as usize)
    };

    if target.is_zero() {
        None
    } else {
        Some(target)
    }
}

/// Expected number of hashes to find a header at `bits`: 2^256 / (target + 1).
pub fn block_proof(bits: u32) -> Option<ChainWork> {
    let target = target_from_compact(bits)?;
    // 2^256 does not fit; (~target / (target + 1)) + 1 is the same value.
    Some((!target / (target + U256::one())) + U256::one())
}

/// In-memory chain index.
#[derive(Debug, Clone)]
pub struct MemoryChainIndex {
    /// Records by hash.
    records: HashMap<Hash, HeaderRecord>,
    /// Child hashes by parent hash.
    children: HashMap<Hash, Vec<Hash>>,
    /// Active chain, index = height.
    active: Vec<Hash>,
    /// Most-work header known.
    best_header: Hash,
}

impl MemoryChainIndex {
    /// Creates an index holding only `genesis`, with its body, as the active tip.
    pub fn new(genesis: &BlockHeader) -> Self {
        let hash = genesis.hash();
        let record = HeaderRecord {
            hash,
            prev_hash: genesis.prev_hash,
            height: 0,
            chain_work: block_proof(genesis.bits).unwrap_or_default(),
            timestamp: genesis.timestamp,
            status: BlockStatus {
                has_data: true,
                valid_tree: true,
                failed: false,
            },
        };

        let mut records = HashMap::new();
        records.insert(hash, record);

        Self {
            records,
            children: HashMap::new(),
            active: vec![hash],
            best_header: hash,
        }
    }

    /// Genesis hash.
    pub fn genesis(&self) -> Hash {
        self.active[0]
    }

    /// Active chain tip.
    pub fn active_tip(&self) -> Hash {
        self.active[self.active.len() - 1]
    }

    /// Active chain height.
    pub fn active_height(&self) -> u64 {
        (self.active.len() - 1) as u64
    }

    /// Number of known headers.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Only genesis is known.
    pub fn is_empty(&self) -> bool {
        self.records.len() <= 1
    }

    /// Record that the block body for `hash` is stored locally.
    pub fn mark_has_data(&mut self, hash: &Hash) -> bool {
        match self.records.get_mut(hash) {
            Some(record) => {
                record.status.has_data = true;
                true
            }
            None => false,
        }
    }

    /// Make `hash` the active tip.
    ///
    /// Every header from genesis to `hash` must have its body and must not
    /// be failed. Returns `false` and leaves the active chain untouched
    /// otherwise.
    pub fn activate(&mut self, hash: &Hash) -> bool {
        let mut path = Vec::new();
        let mut cursor = self.records.get(hash);
        while let Some(record) = cursor {
            if !record.status.has_data || record.status.failed {
                return false;
            }
            path.push(record.hash);
            cursor = record.parent().and_then(|parent| self.records.get(&parent));
        }

        if path.last() != Some(&self.genesis()) {
            return false;
        }

        path.reverse();
        self.active = path;
        debug!(
            tip = %short_hex(hash),
            height = self.active_height(),
            "Active chain updated"
        );
        true
    }

    /// Accept headers, store their bodies and make the last one the active tip.
    pub fn connect_blocks(&mut self, headers: &[BlockHeader]) -> Result<Hash, HeaderRejection> {
        let mut last = self.active_tip();
        for header in headers {
            last = self.accept_header(header)?;
            self.mark_has_data(&last);
        }
        if !self.activate(&last) {
            return Err(HeaderRejection::new(0, "cannot-activate"));
        }
        Ok(last)
    }

    /// Mark `hash` and all of its descendants invalid.
    pub fn mark_failed(&mut self, hash: &Hash) {
        let mut queue = VecDeque::from([*hash]);
        while let Some(next) = queue.pop_front() {
            if let Some(record) = self.records.get_mut(&next) {
                record.status.failed = true;
                record.status.valid_tree = false;
            }
            if let Some(children) = self.children.get(&next) {
                queue.extend(children.iter().copied());
            }
        }

        if let Some(height) = self.records.get(hash).map(|r| r.height as usize) {
            if height > 0 && self.active.get(height) == Some(hash) {
                self.active.truncate(height);
            }
        }

        self.best_header = self
            .records
            .values()
            .filter(|r| !r.status.failed)
            .max_by(|a, b| a.chain_work.cmp(&b.chain_work))
            .map(|r| r.hash)
            .unwrap_or_else(|| self.genesis());
    }

    /// Hash of the ancestor of `hash` at `height`.
    pub fn ancestor_at(&self, hash: &Hash, height: u64) -> Option<Hash> {
        let mut record = self.records.get(hash)?;
        if height > record.height {
            return None;
        }
        while record.height > height {
            record = self.records.get(&record.parent()?)?;
        }
        Some(record.hash)
    }

    /// Check tree consistency, returning one message per violation.
    pub fn verify_tree(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for record in self.records.values() {
            let Some(parent_hash) = record.parent() else {
                continue;
            };
            let Some(parent) = self.records.get(&parent_hash) else {
                violations.push(format!("{} has unknown parent", short_hex(&record.hash)));
                continue;
            };
            if record.height != parent.height + 1 {
                violations.push(format!(
                    "{} height does not follow parent",
                    short_hex(&record.hash)
                ));
            }
            if record.chain_work <= parent.chain_work {
                violations.push(format!("{} work does not exceed parent", short_hex(&record.hash)));
            }
            if parent.status.failed && !record.status.failed {
                violations.push(format!("{} descends from failed header", short_hex(&record.hash)));
            }
        }

        for (height, hash) in self.active.iter().enumerate() {
            match self.records.get(hash) {
                Some(record) => {
                    if record.height != height as u64 || !record.status.has_data {
                        violations.push(format!("active entry {} is inconsistent", height));
                    }
                    if height > 0 && record.prev_hash != self.active[height - 1] {
                        violations.push(format!("active chain breaks at {}", height));
                    }
                }
                None => violations.push(format!("active entry {} is unknown", height)),
            }
        }

        violations
    }
}

impl ChainIndex for MemoryChainIndex {
    fn accept_header(&mut self, header: &BlockHeader) -> Result<Hash, HeaderRejection> {
        let hash = header.hash();

        if let Some(existing) = self.records.get(&hash) {
            if existing.status.failed {
                return Err(HeaderRejection::new(0, "duplicate-invalid"));
            }
            return Ok(hash);
        }

        let parent = self
            .records
            .get(&header.prev_hash)
            .ok_or_else(|| HeaderRejection::new(10, "prev-blk-not-found"))?;
        if parent.status.failed {
            return Err(HeaderRejection::new(100, "bad-prevblk"));
        }
        let proof =
            block_proof(header.bits).ok_or_else(|| HeaderRejection::new(50, "bad-diffbits"))?;
        let chain_work = parent
            .chain_work
            .checked_add(proof)
            .ok_or_else(|| HeaderRejection::new(100, "bad-chainwork"))?;

        let record = HeaderRecord {
            hash,
            prev_hash: header.prev_hash,
            height: parent.height + 1,
            chain_work,
            timestamp: header.timestamp,
            status: BlockStatus {
                has_data: false,
                valid_tree: true,
                failed: false,
            },
        };

        let best_work = self
            .records
            .get(&self.best_header)
            .map(|r| r.chain_work)
            .unwrap_or_default();
        if record.chain_work > best_work {
            self.best_header = hash;
        }

        self.children.entry(header.prev_hash).or_default().push(hash);
        self.records.insert(hash, record);
        Ok(hash)
    }

    fn record(&self, hash: &Hash) -> Option<HeaderRecord> {
        self.records.get(hash).cloned()
    }

    fn contains(&self, hash: &Hash) -> bool {
        self.records.contains_key(hash)
    }

    fn is_on_active_chain(&self, hash: &Hash) -> bool {
        self.records
            .get(hash)
            .map(|r| self.active.get(r.height as usize) == Some(hash))
            .unwrap_or(false)
    }

    fn active_tip_work(&self) -> ChainWork {
        self.records
            .get(&self.active_tip())
            .map(|r| r.chain_work)
            .unwrap_or_default()
    }

    fn best_header(&self) -> Hash {
        self.best_header
    }

    fn locator_for(&self, hash: &Hash) -> BlockLocator {
        let mut hashes = Vec::with_capacity(32);
        let mut step = 1u64;
        let mut cursor = self.records.get(hash).map(|r| r.hash);

        while let Some(current) = cursor {
            hashes.push(current);
            let height = match self.records.get(&current) {
                Some(record) if record.height > 0 => record.height,
                _ => break,
            };
            if hashes.len() >= LOCATOR_DENSE_ENTRIES {
                step = step.saturating_mul(2);
            }
            cursor = self.ancestor_at(&current, height.saturating_sub(step));
        }

        let genesis = self.genesis();
        if hashes.last() != Some(&genesis) {
            hashes.push(genesis);
        }
        BlockLocator::new(hashes)
    }

    fn check_tree_invariants(&self) {
        for violation in self.verify_tree() {
            error!(%violation, "Block tree invariant violated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EASY_BITS: u32 = 0x207f_ffff;

    fn genesis() -> BlockHeader {
        BlockHeader::new([0u8; 32], 1_600_000_000, EASY_BITS, 0)
    }

    fn chain_from(parent: Hash, len: usize, seed: u32) -> Vec<BlockHeader> {
        let mut headers = Vec::with_capacity(len);
        let mut prev = parent;
        for i in 0..len {
            let timestamp = 1_600_000_000 + i as u32 + 1;
            let header = BlockHeader::new(prev, timestamp, EASY_BITS, seed + i as u32);
            prev = header.hash();
            headers.push(header);
        }
        headers
    }

    #[test]
    fn test_block_proof_of_easy_target() {
        assert_eq!(block_proof(EASY_BITS), Some(U256::from(2u64)));
        assert_eq!(block_proof(0), None);
        // Negative target.
        assert_eq!(block_proof(0x0480_0001), None);
    }

    #[test]
    fn test_block_proof_of_mainnet_target() {
        let work = block_proof(0x1d00_ffff).unwrap();
        assert_eq!(work, U256::from(0x0001_0001_0001u64));
    }

    #[test]
    fn test_accept_header_extends_tree() {
        let mut index = MemoryChainIndex::new(&genesis());
        let headers = chain_from(index.genesis(), 3, 1);

        for header in &headers {
            index.accept_header(header).unwrap();
        }

        let tip = index.record(&headers[2].hash()).unwrap();
        assert_eq!(tip.height, 3);
        assert_eq!(tip.chain_work, U256::from(8u64));
        assert!(tip.is_valid_tree());
        assert!(!tip.has_data());
        assert_eq!(index.best_header(), tip.hash);
        // Headers alone never move the active chain.
        assert_eq!(index.active_tip(), index.genesis());
    }

    #[test]
    fn test_duplicate_header_is_accepted_again() {
        let mut index = MemoryChainIndex::new(&genesis());
        let headers = chain_from(index.genesis(), 1, 1);

        let first = index.accept_header(&headers[0]).unwrap();
        let second = index.accept_header(&headers[0]).unwrap();
        assert_eq!(first, second);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_rejections_carry_penalties() {
        let mut index = MemoryChainIndex::new(&genesis());
        let orphan = BlockHeader::new([9u8; 32], 0, EASY_BITS, 0);
        assert_eq!(index.accept_header(&orphan).unwrap_err().penalty, 10);

        let no_work = BlockHeader::new(index.genesis(), 0, 0, 0);
        assert_eq!(index.accept_header(&no_work).unwrap_err().reason, "bad-diffbits");

        let headers = chain_from(index.genesis(), 2, 1);
        index.accept_header(&headers[0]).unwrap();
        index.mark_failed(&headers[0].hash());

        let child = index.accept_header(&headers[1]).unwrap_err();
        assert_eq!(child.penalty, 100);

        let duplicate = index.accept_header(&headers[0]).unwrap_err();
        assert_eq!(duplicate.penalty, 0);
    }

    #[test]
    fn test_chain_work_overflow_is_rejected() {
        // Target 1: each header claims roughly 2^255 work.
        const HARDEST_BITS: u32 = 0x0101_0000;
        let mut index = MemoryChainIndex::new(&genesis());
        let mut prev = index.genesis();
        let mut rejection = None;
        for i in 0..3u32 {
            let header = BlockHeader::new(prev, i + 1, HARDEST_BITS, i);
            match index.accept_header(&header) {
                Ok(hash) => prev = hash,
                Err(e) => {
                    rejection = Some(e);
                    break;
                }
            }
        }

        let rejection = rejection.unwrap();
        assert_eq!(rejection.penalty, 100);
        assert_eq!(rejection.reason, "bad-chainwork");
        assert_eq!(index.best_header(), prev);
        assert!(index.verify_tree().is_empty());
    }

    #[test]
    fn test_connect_blocks_moves_active_chain() {
        let mut index = MemoryChainIndex::new(&genesis());
        let headers = chain_from(index.genesis(), 5, 1);
        let tip = index.connect_blocks(&headers).unwrap();

        assert_eq!(index.active_tip(), tip);
        assert_eq!(index.active_height(), 5);
        assert!(index.is_on_active_chain(&headers[2].hash()));
        assert_eq!(index.active_tip_work(), U256::from(12u64));
    }

    #[test]
    fn test_activate_requires_bodies() {
        let mut index = MemoryChainIndex::new(&genesis());
        let headers = chain_from(index.genesis(), 2, 1);
        for header in &headers {
            index.accept_header(header).unwrap();
        }
        assert!(!index.activate(&headers[1].hash()));
        assert_eq!(index.active_tip(), index.genesis());
    }

    #[test]
    fn test_mark_failed_propagates_to_descendants() {
        let mut index = MemoryChainIndex::new(&genesis());
        let headers = chain_from(index.genesis(), 4, 1);
        index.connect_blocks(&headers).unwrap();

        index.mark_failed(&headers[1].hash());

        assert!(!index.record(&headers[3].hash()).unwrap().is_valid_tree());
        assert!(index.record(&headers[0].hash()).unwrap().is_valid_tree());
        assert_eq!(index.active_tip(), headers[0].hash());
        assert_eq!(index.best_header(), headers[0].hash());
        assert!(index.verify_tree().is_empty());
    }

    #[test]
    fn test_locator_is_dense_then_sparse() {
        let mut index = MemoryChainIndex::new(&genesis());
        let headers = chain_from(index.genesis(), 100, 1);
        let tip = index.connect_blocks(&headers).unwrap();

        let locator = index.locator_for(&tip);
        let heights: Vec<u64> = locator
            .hashes
            .iter()
            .map(|h| index.record(h).unwrap().height)
            .collect();

        assert_eq!(&heights[..10], &[100, 99, 98, 97, 96, 95, 94, 93, 92, 91]);
        assert_eq!(&heights[10..14], &[89, 85, 77, 61]);
        assert_eq!(locator.hashes.last(), Some(&index.genesis()));
    }

    #[test]
    fn test_locator_for_genesis() {
        let index = MemoryChainIndex::new(&genesis());
        let locator = index.locator_for(&index.genesis());
        assert_eq!(locator.hashes, vec![index.genesis()]);
    }

    #[test]
    fn test_verify_tree_clean_after_side_branch() {
        let mut index = MemoryChainIndex::new(&genesis());
        let main = chain_from(index.genesis(), 5, 1);
        index.connect_blocks(&main).unwrap();
        let side = chain_from(main[1].hash(), 6, 1000);
        for header in &side {
            index.accept_header(header).unwrap();
        }

        assert!(index.verify_tree().is_empty());
        assert_eq!(index.best_header(), side[5].hash());
        assert_eq!(index.ancestor_at(&side[5].hash(), 2), Some(main[1].hash()));
    }
}
