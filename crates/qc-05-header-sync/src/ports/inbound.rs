//! Inbound ports (API) for Header Sync.

use crate::domain::{BlockHeader, Hash, HeaderSyncError, PeerId};

/// Primary API for processing peer-supplied headers.
pub trait HeaderSyncApi: Send + Sync {
    /// Process one headers batch from `peer`.
    ///
    /// # Arguments
    /// * `headers` - Headers in message order
    /// * `peer_sent_max` - The message was full; the peer may have more
    /// * `may_be_announcement` - The batch may announce a new tip
    ///
    /// # Returns
    /// Hash of the last accepted header, `None` for an empty batch.
    ///
    /// # Errors
    /// Batch-fatal errors stop processing. Headers accepted before the
    /// failure stay committed; the count is carried by the error.
    fn process_headers(
        &self,
        peer: PeerId,
        headers: &[BlockHeader],
        peer_sent_max: bool,
        may_be_announcement: bool,
    ) -> Result<Option<Hash>, HeaderSyncError>;

    /// Recover from a header whose parent we do not have.
    ///
    /// Returns `true` if the header does not connect and headers were
    /// requested; the caller must not process it further.
    fn request_connect_headers(
        &self,
        peer: PeerId,
        header: &BlockHeader,
        count_toward_limit: bool,
    ) -> bool;

    /// Handle a raw `headers` message: size check, unconnecting detection
    /// and batch processing.
    fn handle_headers_message(
        &self,
        peer: PeerId,
        headers: &[BlockHeader],
    ) -> Result<Option<Hash>, HeaderSyncError>;
}
