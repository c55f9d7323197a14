//! # Domain Errors
//!
//! Error types for header synchronisation.
//!
//! Batch-fatal errors carry the number of headers already committed to the
//! chain index in the same call. Those headers stay committed: a headers
//! message is processed as a prefix, never as a transaction.

use thiserror::Error;

use super::entities::{short_hex, Hash};

/// Header synchronisation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeaderSyncError {
    /// A header's parent is not the header accepted just before it.
    #[error(
        "Non-continuous headers sequence: expected parent {}, got {} ({committed} committed)",
        short_hex(.expected_prev),
        short_hex(.actual_prev)
    )]
    NonContinuousSequence {
        /// Hash of the previously accepted header in this batch.
        expected_prev: Hash,
        /// Parent hash carried by the offending header.
        actual_prev: Hash,
        /// Headers committed before the abort.
        committed: usize,
    },

    /// The chain index rejected a header.
    #[error(
        "Invalid header {}: {reason} (penalty {penalty}, {committed} committed)",
        short_hex(.hash)
    )]
    InvalidHeader {
        /// Hash of the rejected header.
        hash: Hash,
        /// Misbehavior points attached by the chain index (0 = benign).
        penalty: u32,
        /// Rejection reason reported by the chain index.
        reason: String,
        /// Headers committed before the abort.
        committed: usize,
    },

    /// A headers message exceeded the protocol maximum.
    #[error("Headers message too large: {count} headers (max: {max})")]
    HeadersMessageTooLarge {
        /// Number of headers in the message.
        count: usize,
        /// Protocol maximum.
        max: usize,
    },

    /// Outbound send failed.
    #[error("Network error: {0}")]
    Network(String),
}

impl HeaderSyncError {
    /// Number of headers that were committed before the batch aborted.
    pub fn committed(&self) -> usize {
        match self {
            Self::NonContinuousSequence { committed, .. }
            | Self::InvalidHeader { committed, .. } => *committed,
            Self::HeadersMessageTooLarge { .. } | Self::Network(_) => 0,
        }
    }
}

/// Structured rejection returned by the chain index for a single header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRejection {
    /// Misbehavior points the sender deserves (0 = benign, e.g. known-invalid duplicate).
    pub penalty: u32,
    /// Short machine-readable reason.
    pub reason: String,
}

impl HeaderRejection {
    /// Creates a rejection.
    pub fn new(penalty: u32, reason: impl Into<String>) -> Self {
        Self {
            penalty,
            reason: reason.into(),
        }
    }
}
