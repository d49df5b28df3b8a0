//! Gossip adapter: the substrate-facing half of a peer.
//!
//! None of these callbacks go through the peer's command queue. They run on
//! whatever thread the substrate uses and rely on the store's own locking.

use crate::transport::Gossiper;
use rumor_core::{Message, PeerId, Result};
use rumor_store::CacheStore;
use std::sync::Arc;

/// [`Gossiper`] backed by a peer's cache store
#[derive(Debug, Clone)]
pub struct GossipAdapter {
    peer_id: PeerId,
    store: Arc<CacheStore>,
}

impl GossipAdapter {
    /// Adapter answering for `peer_id` from `store`
    pub fn new(peer_id: PeerId, store: Arc<CacheStore>) -> Self {
        Self { peer_id, store }
    }

    /// Identity this adapter answers for
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }
}

impl Gossiper for GossipAdapter {
    fn export_state(&self) -> Message {
        self.store.snapshot()
    }

    fn on_gossip(&self, update: &[u8]) -> Result<Option<Message>> {
        let msg = Message::decode(update)?;
        let delta = self.store.merge_new(&msg);

        tracing::debug!(
            peer = %self.peer_id,
            from = %msg.peer_id(),
            received = msg.len(),
            reply = delta.as_ref().map_or(0, Message::len),
            "on_gossip {:?} => delta {:?}",
            msg,
            delta
        );
        Ok(delta)
    }

    fn on_gossip_broadcast(&self, src: PeerId, update: &[u8]) -> Result<Option<Message>> {
        if src == self.peer_id {
            return Ok(None);
        }
        let msg = Message::decode(update)?;
        let received = self.store.merge_delta(&msg);

        tracing::debug!(
            peer = %self.peer_id,
            from = %src,
            received = msg.len(),
            relayed = received.as_ref().map_or(0, Message::len),
            "on_gossip_broadcast {:?} => delta {:?}",
            msg,
            received
        );
        Ok(received)
    }

    fn on_gossip_unicast(&self, src: PeerId, update: &[u8]) -> Result<()> {
        let msg = Message::decode(update)?;
        tracing::trace!(peer = %self.peer_id, from = %src, entries = msg.len(), "on_gossip_unicast");
        self.store.merge_complete(&msg);
        Ok(())
    }
}
