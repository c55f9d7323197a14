//! # Missing Ancestor Walk
//!
//! Finds the blocks we would need to switch to a newly announced tip,
//! and decides whether fetching them directly is worthwhile.

use crate::domain::{Hash, MissingAncestorWindow};
use crate::ports::{ChainIndex, InFlightIndex};

/// Walk back from `tip` until the active chain, collecting ancestors whose
/// body is neither stored nor requested.
///
/// At most `walk_limit` headers are examined. Running out before reaching
/// the active chain yields an empty window: we are too far behind for
/// direct fetch to help. The window keeps at most `transit_cap` entries,
/// those nearest the active chain.
pub fn find_missing_blocks<C, F>(
    chain: &C,
    in_flight: &F,
    tip: &Hash,
    transit_cap: usize,
    walk_limit: usize,
) -> MissingAncestorWindow
where
    C: ChainIndex + ?Sized,
    F: InFlightIndex + ?Sized,
{
    let mut window = MissingAncestorWindow::new(transit_cap);
    let mut walked = 0usize;
    let mut cursor = chain.record(tip);

    while let Some(record) = cursor {
        walked += 1;
        if walked > walk_limit {
            window.clear();
            return window;
        }

        if chain.is_on_active_chain(&record.hash) {
            break;
        }

        if !record.has_data() && !in_flight.is_in_flight(&record.hash) {
            window.push_older(record.hash);
        }

        cursor = record.parent().and_then(|parent| chain.record(&parent));
    }

    window
}

/// Whether `tip` could become the active chain: its header tree is valid
/// and it has at least the active tip's work.
pub fn has_equal_or_more_work<C: ChainIndex + ?Sized>(chain: &C, tip: &Hash) -> bool {
    chain
        .record(tip)
        .map(|record| record.is_valid_tree() && chain.active_tip_work() <= record.chain_work)
        .unwrap_or(false)
}
