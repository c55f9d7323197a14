//! Capturing adapters for outbound messages and misbehavior reports.
//!
//! Used by tests and by embedders that forward captured traffic from a
//! single-threaded loop.

use parking_lot::Mutex;

use crate::domain::{BlockLocator, HeaderSyncError, InventoryItem, PeerId};
use crate::ports::{MisbehaviorReporter, NetworkMessage, PeerNetwork};

/// Records every message instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingNetwork {
    sent: Mutex<Vec<(PeerId, NetworkMessage)>>,
    fail_sends: bool,
}

impl RecordingNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Network whose sends all fail (after being recorded).
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_sends: true,
        }
    }

    /// All messages in send order.
    pub fn sent(&self) -> Vec<(PeerId, NetworkMessage)> {
        self.sent.lock().clone()
    }

    /// `getheaders` locators sent to `peer`.
    pub fn get_headers_to(&self, peer: &PeerId) -> Vec<BlockLocator> {
        self.sent
            .lock()
            .iter()
            .filter(|(p, _)| p == peer)
            .filter_map(|(_, m)| match m {
                NetworkMessage::GetHeaders { locator, .. } => Some(locator.clone()),
                _ => None,
            })
            .collect()
    }

    /// `getdata` inventories sent to `peer`.
    pub fn get_data_to(&self, peer: &PeerId) -> Vec<Vec<InventoryItem>> {
        self.sent
            .lock()
            .iter()
            .filter(|(p, _)| p == peer)
            .filter_map(|(_, m)| match m {
                NetworkMessage::GetData { inventory, .. } => Some(inventory.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl PeerNetwork for RecordingNetwork {
    fn send_to_peer(&self, peer: PeerId, message: NetworkMessage) -> Result<(), HeaderSyncError> {
        self.sent.lock().push((peer, message));
        if self.fail_sends {
            return Err(HeaderSyncError::Network("send failed".to_string()));
        }
        Ok(())
    }
}

/// A single misbehavior report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MisbehaviorReport {
    pub peer: PeerId,
    pub points: u32,
    pub reason: String,
}

/// Records misbehavior reports.
#[derive(Debug, Default)]
pub struct RecordingMisbehavior {
    reports: Mutex<Vec<MisbehaviorReport>>,
}

impl RecordingMisbehavior {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<MisbehaviorReport> {
        self.reports.lock().clone()
    }

    /// Sum of points reported against `peer`.
    pub fn score(&self, peer: &PeerId) -> u32 {
        self.reports
            .lock()
            .iter()
            .filter(|r| r.peer == *peer)
            .map(|r| r.points)
            .sum()
    }
}

impl MisbehaviorReporter for RecordingMisbehavior {
    fn report_misbehavior(&self, peer: PeerId, points: u32, reason: &str) {
        self.reports.lock().push(MisbehaviorReport {
            peer,
            points,
            reason: reason.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_network_filters_by_peer() {
        let network = RecordingNetwork::new();
        let a = PeerId::new([1u8; 32]);
        let b = PeerId::new([2u8; 32]);

        network
            .send_to_peer(
                a,
                NetworkMessage::GetHeaders {
                    locator: BlockLocator::new(vec![[0u8; 32]]),
                    stop_hash: None,
                },
            )
            .unwrap();
        network
            .send_to_peer(
                b,
                NetworkMessage::GetData {
                    request_id: uuid::Uuid::nil(),
                    inventory: vec![InventoryItem::block([3u8; 32])],
                },
            )
            .unwrap();

        assert_eq!(network.get_headers_to(&a).len(), 1);
        assert!(network.get_data_to(&a).is_empty());
        assert_eq!(network.get_data_to(&b), vec![vec![InventoryItem::block([3u8; 32])]]);
    }

    #[test]
    fn test_failing_network_still_records() {
        let network = RecordingNetwork::failing();
        let result = network.send_to_peer(
            PeerId::new([1u8; 32]),
            NetworkMessage::GetHeaders {
                locator: BlockLocator::default(),
                stop_hash: None,
            },
        );
        assert!(matches!(result, Err(HeaderSyncError::Network(_))));
        assert_eq!(network.sent().len(), 1);
    }

    #[test]
    fn test_misbehavior_score_sums_points() {
        let reporter = RecordingMisbehavior::new();
        let peer = PeerId::new([1u8; 32]);
        reporter.report_misbehavior(peer, 20, "invalid header");
        reporter.report_misbehavior(peer, 10, "prev-blk-not-found");
        reporter.report_misbehavior(PeerId::new([2u8; 32]), 50, "other");
        assert_eq!(reporter.score(&peer), 30);
        assert_eq!(reporter.reports().len(), 3);
    }
}
