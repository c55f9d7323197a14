//! # Header Processor
//!
//! Application service sequencing header acceptance, peer bookkeeping,
//! continuation requests and direct block fetch for each headers message.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::algorithms::header_acceptor::penalize;
use crate::algorithms::{
    accept_headers, find_missing_blocks, has_equal_or_more_work, select_downloads,
    update_block_availability,
};
use crate::config::HeaderSyncConfig;
use crate::domain::{
    check_all_invariants, short_hex, BlockHeader, Hash, HeaderRecord, HeaderSyncError, PeerId,
    PeerStates,
};
use crate::ports::{
    AnnouncementAdmission, ChainIndex, HeaderSyncApi, InFlightIndex, MisbehaviorReporter,
    NetworkMessage, PeerNetwork,
};

/// State shared by every peer's handler: the header tree and the
/// outstanding block requests.
///
/// Always locked together so a walk and the in-flight marks it produces
/// see one consistent snapshot.
#[derive(Debug)]
pub struct ChainState<C, F> {
    pub chain: C,
    pub in_flight: F,
}

impl<C, F> ChainState<C, F> {
    pub fn new(chain: C, in_flight: F) -> Self {
        Self { chain, in_flight }
    }
}

/// Header Processor - processes headers messages from peers.
pub struct HeaderProcessor<C, F, N, M, A> {
    /// Configuration.
    config: HeaderSyncConfig,
    /// Chain-state lock.
    state: Arc<Mutex<ChainState<C, F>>>,
    /// Per-peer header state.
    peers: Arc<PeerStates>,
    /// Outbound messages.
    network: Arc<N>,
    /// Penalty sink.
    misbehavior: Arc<M>,
    /// Direct-fetch admission policy.
    admission: Arc<A>,
}

impl<C, F, N, M, A> HeaderProcessor<C, F, N, M, A>
where
    C: ChainIndex,
    F: InFlightIndex,
    N: PeerNetwork,
    M: MisbehaviorReporter,
    A: AnnouncementAdmission,
{
    /// Create a new header processor.
    pub fn new(
        config: HeaderSyncConfig,
        state: Arc<Mutex<ChainState<C, F>>>,
        peers: Arc<PeerStates>,
        network: Arc<N>,
        misbehavior: Arc<M>,
        admission: Arc<A>,
    ) -> Self {
        Self {
            config,
            state,
            peers,
            network,
            misbehavior,
            admission,
        }
    }

    pub fn config(&self) -> &HeaderSyncConfig {
        &self.config
    }

    /// The chain-state lock shared with block-body handlers.
    pub fn chain_state(&self) -> &Arc<Mutex<ChainState<C, F>>> {
        &self.state
    }

    pub fn peers(&self) -> &Arc<PeerStates> {
        &self.peers
    }

    /// Fire-and-forget send; failures are logged only.
    fn send(&self, peer: PeerId, message: NetworkMessage) {
        if let Err(e) = self.network.send_to_peer(peer, message) {
            warn!(peer = %peer, error = %e, "Failed to send message to peer");
        }
    }

    /// Everything after the chain-state lock is taken.
    fn process_locked(
        &self,
        state: &mut ChainState<C, F>,
        peer: PeerId,
        headers: &[BlockHeader],
        peer_sent_max: bool,
        may_be_announcement: bool,
    ) -> Result<Option<Hash>, HeaderSyncError> {
        let accepted = accept_headers(
            &mut state.chain,
            peer,
            headers,
            self.misbehavior.as_ref(),
            self.config.invalid_sequence_penalty,
        )?;

        let chain = &state.chain;
        let starting_height = self.peers.with_peer(peer, |peer_state| {
            if peer_state.unconnecting_headers > 0 {
                debug!(
                    peer = %peer,
                    unconnecting = peer_state.unconnecting_headers,
                    "Resetting unconnecting headers counter"
                );
            }
            peer_state.reset_unconnecting();
            if let Some(last) = &accepted {
                update_block_availability(peer_state, last, chain);
            }
            peer_state.starting_height
        });

        let Some(last) = accepted else {
            return Ok(None);
        };
        let Some(tip) = state.chain.record(&last) else {
            return Ok(Some(last));
        };

        if peer_sent_max {
            info!(
                height = tip.height,
                peer = %peer,
                starting_height,
                "More headers available; requesting continuation"
            );
            self.send(
                peer,
                NetworkMessage::GetHeaders {
                    locator: state.chain.locator_for(&last),
                    stop_hash: None,
                },
            );
        }

        if may_be_announcement && has_equal_or_more_work(&state.chain, &last) {
            self.direct_fetch(state, peer, &tip);
        }

        Ok(Some(last))
    }

    /// Request the missing ancestors of `tip` from `peer`.
    fn direct_fetch(&self, state: &mut ChainState<C, F>, peer: PeerId, tip: &HeaderRecord) {
        let window = find_missing_blocks(
            &state.chain,
            &state.in_flight,
            &tip.hash,
            self.config.max_blocks_in_transit_per_peer,
            self.config.direct_fetch_walk_limit,
        );
        if window.is_empty() {
            return;
        }

        let transit_cap = self.config.max_blocks_in_transit_per_peer;
        let request = select_downloads(
            &window,
            peer,
            self.admission.as_ref(),
            &mut state.in_flight,
        );
        debug_assert_eq!(
            check_all_invariants(&window, &request.requested, transit_cap),
            Ok(())
        );
        if request.is_empty() {
            debug!(peer = %peer, missing = window.len(), "Direct fetch declined by admission");
            return;
        }

        info!(
            tip = %short_hex(&tip.hash),
            height = tip.height,
            count = request.requested.len(),
            request_id = %request.request_id,
            peer = %peer,
            "Downloading blocks toward announced tip"
        );
        self.send(
            peer,
            NetworkMessage::GetData {
                request_id: request.request_id,
                inventory: request.inventory,
            },
        );
    }
}

impl<C, F, N, M, A> HeaderSyncApi for HeaderProcessor<C, F, N, M, A>
where
    C: ChainIndex,
    F: InFlightIndex,
    N: PeerNetwork,
    M: MisbehaviorReporter,
    A: AnnouncementAdmission,
{
    fn process_headers(
        &self,
        peer: PeerId,
        headers: &[BlockHeader],
        peer_sent_max: bool,
        may_be_announcement: bool,
    ) -> Result<Option<Hash>, HeaderSyncError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let result = self.process_locked(state, peer, headers, peer_sent_max, may_be_announcement);
        if let Err(e) = &result {
            warn!(
                peer = %peer,
                error = %e,
                committed = e.committed(),
                "Header batch aborted"
            );
        }

        if self.config.check_tree_invariants {
            state.chain.check_tree_invariants();
        }
        result
    }

    fn request_connect_headers(
        &self,
        peer: PeerId,
        header: &BlockHeader,
        count_toward_limit: bool,
    ) -> bool {
        let guard = self.state.lock();
        if guard.chain.contains(&header.prev_hash) {
            return false;
        }

        let hash = header.hash();
        let period = self.config.max_unconnecting_headers;
        let (locator_from, unconnecting, should_penalize) =
            self.peers.with_peer(peer, |peer_state| {
                update_block_availability(peer_state, &hash, &guard.chain);
                let should_penalize =
                    count_toward_limit && peer_state.record_unconnecting(period);
                let from = peer_state
                    .best_known_header
                    .unwrap_or_else(|| guard.chain.best_header());
                (from, peer_state.unconnecting_headers, should_penalize)
            });
        let locator = guard.chain.locator_for(&locator_from);
        drop(guard);

        debug!(
            hash = %short_hex(&hash),
            prev = %short_hex(&header.prev_hash),
            peer = %peer,
            unconnecting,
            "Received header that does not connect; requesting headers"
        );
        self.send(
            peer,
            NetworkMessage::GetHeaders {
                locator,
                stop_hash: None,
            },
        );

        if should_penalize {
            penalize(
                self.misbehavior.as_ref(),
                peer,
                self.config.unconnecting_penalty,
                "unconnecting headers",
            );
        }
        true
    }

    fn handle_headers_message(
        &self,
        peer: PeerId,
        headers: &[BlockHeader],
    ) -> Result<Option<Hash>, HeaderSyncError> {
        let count = headers.len();
        let max = self.config.max_headers_results;
        if count > max {
            penalize(
                self.misbehavior.as_ref(),
                peer,
                self.config.oversized_message_penalty,
                "oversized headers message",
            );
            return Err(HeaderSyncError::HeadersMessageTooLarge { count, max });
        }

        let Some(first) = headers.first() else {
            return Ok(None);
        };

        let count_toward_limit = count < self.config.max_blocks_to_announce;
        if self.request_connect_headers(peer, first, count_toward_limit) {
            return Ok(None);
        }

        self.process_headers(
            peer,
            headers,
            count == max,
            count <= self.config.max_blocks_to_announce,
        )
    }
}
