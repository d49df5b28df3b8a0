//! Contract with the gossip substrate.
//!
//! The substrate owns connections, membership and retransmission. It hands
//! inbound frames to a [`Gossiper`] and receives outbound state through a
//! [`GossipTransport`].

use async_trait::async_trait;
use rumor_core::{Message, PeerId, Result};

/// Outbound dissemination capability registered with a peer
#[async_trait]
pub trait GossipTransport: Send + Sync {
    /// Disseminate `message` to the mesh; best effort
    async fn broadcast(&self, message: Message);
}

/// Callbacks the substrate invokes on message arrival
///
/// Implementations may be called concurrently from any thread and should
/// return promptly.
pub trait Gossiper: Send + Sync {
    /// Full local state, used to seed anti-entropy exchanges
    fn export_state(&self) -> Message;

    /// Pull exchange: merge `update`, return what its sender is missing
    fn on_gossip(&self, update: &[u8]) -> Result<Option<Message>>;

    /// Push exchange: merge `update`, return what it taught us for relaying
    fn on_gossip_broadcast(&self, src: PeerId, update: &[u8]) -> Result<Option<Message>>;

    /// Direct delivery: merge `update`
    fn on_gossip_unicast(&self, src: PeerId, update: &[u8]) -> Result<()>;
}
