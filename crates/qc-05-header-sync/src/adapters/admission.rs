//! Transit-cap admission policy for direct fetch.

use crate::domain::{Hash, InventoryItem, PeerId};
use crate::ports::{AnnouncementAdmission, InFlightIndex};

/// Admits block requests while the peer has fewer than `transit_cap`
/// blocks in flight.
///
/// The caller marks each admitted block in flight before asking about
/// the next one, so capacity tightens as the batch grows.
#[derive(Debug, Clone, Copy)]
pub struct TransitCapAdmission {
    transit_cap: usize,
}

impl TransitCapAdmission {
    pub fn new(transit_cap: usize) -> Self {
        Self { transit_cap }
    }
}

impl AnnouncementAdmission for TransitCapAdmission {
    fn decide(
        &self,
        hash: &Hash,
        peer: PeerId,
        in_flight: &dyn InFlightIndex,
        batch: &mut Vec<InventoryItem>,
    ) -> bool {
        if in_flight.is_in_flight(hash) || in_flight.in_flight_count(&peer) >= self.transit_cap {
            return false;
        }
        batch.push(InventoryItem::block(*hash));
        true
    }
}
