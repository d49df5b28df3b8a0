//! Shared fixtures for peer integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rumor_core::{Message, PeerId};
use rumor_peer::{GossipAdapter, GossipTransport, Gossiper, Peer, PeerConfig};
use rumor_store::ManualClock;
use std::collections::VecDeque;
use std::sync::Arc;

/// Install a test-writer subscriber honouring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Peer with a frozen clock at 0 so small test deadlines never expire
pub fn peer(id: u64) -> Peer {
    Peer::with_clock(PeerConfig::new(PeerId(id)), Arc::new(ManualClock::new(0)))
        .expect("valid peer config")
}

/// Transport that only records what it was asked to send
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Message>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }

    /// Single wire frame of the `index`th broadcast
    pub fn frame(&self, index: usize) -> Vec<u8> {
        let mut frames = self.sent.lock()[index].encode();
        assert_eq!(frames.len(), 1, "messages encode to a single frame");
        frames.remove(0)
    }
}

#[async_trait]
impl GossipTransport for RecordingTransport {
    async fn broadcast(&self, message: Message) {
        self.sent.lock().push(message);
    }
}

/// In-memory mesh flooding broadcasts through every member's callbacks
///
/// Each hop relays only what the receiver reported as newly incorporated,
/// so a wave stops once nobody learns anything.
#[derive(Default)]
pub struct LoopbackMesh {
    members: Mutex<Vec<(PeerId, GossipAdapter)>>,
}

impl LoopbackMesh {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add `peer` to the mesh and wire its outbound transport to it
    pub async fn join(self: &Arc<Self>, peer: &Peer) {
        self.members.lock().push((peer.peer_id(), peer.gossiper()));
        let link = Arc::new(MeshLink {
            origin: peer.peer_id(),
            mesh: self.clone(),
        });
        peer.register_transport(link)
            .await
            .expect("peer is running");
    }

    pub fn flood(&self, origin: PeerId, message: Message) {
        let members = self.members.lock().clone();
        let mut waves = VecDeque::from([(origin, message)]);

        while let Some((src, msg)) = waves.pop_front() {
            for frame in msg.encode() {
                for (id, gossip) in &members {
                    if *id == src {
                        continue;
                    }
                    match gossip.on_gossip_broadcast(src, &frame) {
                        Ok(Some(relay)) => waves.push_back((*id, relay)),
                        Ok(None) => {}
                        Err(e) => panic!("mesh delivered an undecodable frame: {e}"),
                    }
                }
            }
        }
    }
}

struct MeshLink {
    origin: PeerId,
    mesh: Arc<LoopbackMesh>,
}

#[async_trait]
impl GossipTransport for MeshLink {
    async fn broadcast(&self, message: Message) {
        self.mesh.flood(self.origin, message);
    }
}
