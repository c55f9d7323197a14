//! # Header Acceptor
//!
//! Commits a headers batch to the chain index one header at a time,
//! enforcing parent continuity inside the batch.

use tracing::{debug, info};

use crate::domain::{short_hex, BlockHeader, Hash, HeaderSyncError, PeerId};
use crate::ports::{ChainIndex, MisbehaviorReporter};

/// Accept `headers` in order.
///
/// Each header after the first must name the previously accepted header
/// as its parent. The first header must connect to a header the chain
/// index already knows; the index itself enforces that.
///
/// # Returns
/// Hash of the last accepted header, `None` for an empty batch.
///
/// # Errors
/// - `NonContinuousSequence` when a parent link is broken
///   (`sequence_penalty` is reported)
/// - `InvalidHeader` when the chain index rejects a header (its penalty
///   is reported when non-zero)
///
/// Headers accepted before the failure are not rolled back.
pub fn accept_headers<C: ChainIndex + ?Sized>(
    chain: &mut C,
    peer: PeerId,
    headers: &[BlockHeader],
    reporter: &dyn MisbehaviorReporter,
    sequence_penalty: u32,
) -> Result<Option<Hash>, HeaderSyncError> {
    let mut last: Option<Hash> = None;

    for (committed, header) in headers.iter().enumerate() {
        if let Some(prev) = last {
            if header.prev_hash != prev {
                penalize(reporter, peer, sequence_penalty, "non-continuous header sequence");
                return Err(HeaderSyncError::NonContinuousSequence {
                    expected_prev: prev,
                    actual_prev: header.prev_hash,
                    committed,
                });
            }
        }

        match chain.accept_header(header) {
            Ok(hash) => last = Some(hash),
            Err(rejection) => {
                let hash = header.hash();
                debug!(
                    peer = %peer,
                    hash = %short_hex(&hash),
                    reason = %rejection.reason,
                    penalty = rejection.penalty,
                    "Header rejected"
                );
                if rejection.penalty > 0 {
                    penalize(reporter, peer, rejection.penalty, "invalid header");
                }
                return Err(HeaderSyncError::InvalidHeader {
                    hash,
                    penalty: rejection.penalty,
                    reason: rejection.reason,
                    committed,
                });
            }
        }
    }

    Ok(last)
}

/// Report `points` against `peer` and log it.
pub(crate) fn penalize(
    reporter: &dyn MisbehaviorReporter,
    peer: PeerId,
    points: u32,
    reason: &str,
) {
    info!(peer = %peer, points, reason, "Misbehavior reported");
    reporter.report_misbehavior(peer, points, reason);
}
