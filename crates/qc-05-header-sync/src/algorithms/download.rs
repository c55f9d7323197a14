//! # Direct Fetch Selection
//!
//! Turns a missing-ancestor window into one block request for a peer.

use std::time::Instant;

use uuid::Uuid;

use crate::domain::{Hash, InFlightMark, InventoryItem, MissingAncestorWindow, PeerId};
use crate::ports::{AnnouncementAdmission, InFlightIndex};

/// Blocks selected for one `getdata` message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Correlates the `getdata` with its in-flight marks.
    pub request_id: Uuid,
    /// Inventory built by the admission policy.
    pub inventory: Vec<InventoryItem>,
    /// Hashes marked in flight, oldest first.
    pub requested: Vec<Hash>,
}

impl DownloadRequest {
    pub fn is_empty(&self) -> bool {
        self.requested.is_empty()
    }
}

/// Offer window entries to `admission` oldest first, marking each
/// admitted block in flight for `peer`.
///
/// Stops at the first decline, so the request is always a prefix of the
/// window.
pub fn select_downloads<F: InFlightIndex>(
    window: &MissingAncestorWindow,
    peer: PeerId,
    admission: &dyn AnnouncementAdmission,
    in_flight: &mut F,
) -> DownloadRequest {
    let request_id = Uuid::new_v4();
    let mut inventory = Vec::with_capacity(window.len());
    let mut requested = Vec::with_capacity(window.len());

    for hash in window.iter() {
        if !admission.decide(hash, peer, &*in_flight, &mut inventory) {
            break;
        }
        in_flight.mark_in_flight(InFlightMark {
            peer,
            hash: *hash,
            requested_at: Instant::now(),
            request_id,
        });
        requested.push(*hash);
    }

    DownloadRequest {
        request_id,
        inventory,
        requested,
    }
}
