//! Peer Gossip Scenarios
//!
//! End-to-end behaviour of the peer actor and gossip callbacks: push
//! dissemination, pull anti-entropy, direct delivery, deletions and the
//! self-origin guard.

mod support;

use rumor_core::{Entry, Message, PeerId, RumorError, Value, MAX_EXPIRES_AT};
use rumor_peer::{Gossiper, PeerConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use support::{init_tracing, peer, LoopbackMesh, RecordingTransport};

fn int(n: u64) -> Value {
    Value::encode(&n).expect("integers encode")
}

// ============================================================================
// Push dissemination
// ============================================================================

#[tokio::test]
async fn broadcast_reaches_empty_peer_and_is_reported_as_delta() {
    init_tracing();
    let a = peer(1);
    let b = peer(2);
    let wire = Arc::new(RecordingTransport::default());
    a.register_transport(wire.clone()).await.unwrap();

    a.set("x", int(1), 100).await.unwrap();
    let delta = b
        .on_gossip_broadcast(a.peer_id(), &wire.frame(0))
        .unwrap()
        .expect("x is new to b");

    let expected: BTreeMap<String, Entry> =
        [("x".to_string(), Entry::new(int(1), 100, 0))].into_iter().collect();
    assert_eq!(delta.entries(), expected);
    assert_eq!(b.export_state().entries(), expected);
    assert_eq!(b.get("x"), Some(int(1)));
}

#[tokio::test]
async fn newer_resident_entry_survives_older_broadcast() {
    init_tracing();
    let a = peer(1);
    let b = peer(2);
    let wire = Arc::new(RecordingTransport::default());
    a.register_transport(wire.clone()).await.unwrap();
    b.set("x", int(2), 150).await.unwrap();

    a.set("x", int(1), 100).await.unwrap();
    let delta = b.on_gossip_broadcast(a.peer_id(), &wire.frame(0)).unwrap();

    assert!(delta.is_none());
    assert_eq!(b.get("x"), Some(int(2)));
    assert_eq!(b.export_state().get("x").unwrap().expires_at(), 150);
}

#[tokio::test]
async fn redelivered_broadcast_is_not_relayed_again() {
    let a = peer(1);
    let b = peer(2);
    let wire = Arc::new(RecordingTransport::default());
    a.register_transport(wire.clone()).await.unwrap();
    a.set("x", int(1), 100).await.unwrap();
    let frame = wire.frame(0);

    assert!(b.on_gossip_broadcast(a.peer_id(), &frame).unwrap().is_some());
    assert!(b.on_gossip_broadcast(a.peer_id(), &frame).unwrap().is_none());
}

#[tokio::test]
async fn self_broadcast_is_ignored() {
    let a = peer(1);
    let other = Message::new(PeerId(9), 1);
    other.add("x", int(1), 100, 0);
    let frame = other.encode().remove(0);

    assert_eq!(a.on_gossip_broadcast(a.peer_id(), &frame), Ok(None));
    assert_eq!(a.on_gossip_broadcast(a.peer_id(), b"\x00garbage"), Ok(None));
    assert!(a.is_empty());
}

// ============================================================================
// Deletion
// ============================================================================

#[tokio::test]
async fn delete_of_absent_key_reports_false_and_stays_silent() {
    let a = peer(1);
    let wire = Arc::new(RecordingTransport::default());
    a.register_transport(wire.clone()).await.unwrap();

    assert!(!a.delete("x", 200).await.unwrap());
    assert!(wire.sent().is_empty());
}

#[tokio::test]
async fn tombstone_propagates_and_hides_key() {
    init_tracing();
    let mesh = LoopbackMesh::new();
    let (a, b, c) = (peer(1), peer(2), peer(3));
    for p in [&a, &b, &c] {
        mesh.join(p).await;
    }

    a.set("x", int(1), 100).await.unwrap();
    assert_eq!(c.get("x"), Some(int(1)));

    assert!(b.delete("x", 200).await.unwrap());

    for p in [&a, &b, &c] {
        assert_eq!(p.get("x"), None);
        let tomb = p.export_state().get("x").expect("tombstone is replicated");
        assert_eq!(tomb.deleted_at(), 200);
    }
}

#[tokio::test]
async fn delete_at_latest_deadline_hides_key_on_every_member() {
    let mesh = LoopbackMesh::new();
    let (a, b, c) = (peer(1), peer(2), peer(3));
    for p in [&a, &b, &c] {
        mesh.join(p).await;
    }

    a.set("x", Value::from("v"), MAX_EXPIRES_AT).await.unwrap();
    assert_eq!(b.get("x"), Some(Value::from("v")));

    assert!(a.delete("x", 200).await.unwrap());

    for p in [&a, &b, &c] {
        assert_eq!(p.get("x"), None);
        let tomb = p.export_state().get("x").expect("tombstone is replicated");
        assert!(tomb.is_tombstone());
        assert_eq!(tomb.expires_at(), i64::MAX);
    }
}

#[tokio::test]
async fn unrepresentable_deadline_never_reaches_the_mesh() {
    let mesh = LoopbackMesh::new();
    let (a, b) = (peer(1), peer(2));
    for p in [&a, &b] {
        mesh.join(p).await;
    }

    let err = a.set("x", Value::from("v"), i64::MAX).await.unwrap_err();

    assert!(matches!(err, RumorError::InvalidEntry { .. }));
    assert!(a.is_empty());
    assert!(b.is_empty());
}

#[tokio::test]
async fn remote_entry_without_successor_version_is_not_deleted_locally() {
    let a = peer(1);
    let b = peer(2);
    let foreign = Message::new(PeerId(9), 1);
    foreign.add("x", Value::from("v"), i64::MAX, 0);
    let frame = foreign.encode().remove(0);
    a.on_gossip_broadcast(PeerId(9), &frame).unwrap();
    b.on_gossip_broadcast(PeerId(9), &frame).unwrap();

    assert!(!a.delete("x", 200).await.unwrap());

    assert_eq!(a.get("x"), b.get("x"));
    assert_eq!(a.export_state().entries(), b.export_state().entries());
}

// ============================================================================
// Pull anti-entropy and unicast
// ============================================================================

#[tokio::test]
async fn pull_exchange_returns_what_initiator_lacks() {
    let a = peer(1);
    let b = peer(2);
    a.set("shared", int(1), 100).await.unwrap();
    a.set("only-a", int(1), 100).await.unwrap();
    b.set("shared", int(2), 300).await.unwrap();
    b.set("only-b", int(2), 100).await.unwrap();

    let request = a.export_state().encode().remove(0);
    let reply = b.on_gossip(&request).unwrap().expect("b knows more");

    assert_eq!(reply.peer_id(), b.peer_id());
    assert_eq!(reply.keys(), vec!["only-b".to_string(), "shared".to_string()]);
    assert_eq!(b.get("only-a"), Some(int(1)));

    a.on_gossip_unicast(b.peer_id(), &reply.encode().remove(0))
        .unwrap();
    assert_eq!(a.export_state().entries(), b.export_state().entries());

    let again = a.export_state().encode().remove(0);
    assert!(b.on_gossip(&again).unwrap().is_none());
}

#[tokio::test]
async fn malformed_frames_are_rejected_without_side_effects() {
    let a = peer(1);
    a.set("k", int(1), 100).await.unwrap();
    let before = a.export_state();

    for result in [
        a.on_gossip(b"junk").map(|_| ()),
        a.on_gossip_broadcast(PeerId(2), b"junk").map(|_| ()),
        a.on_gossip_unicast(PeerId(2), b"junk"),
    ] {
        assert!(matches!(result, Err(RumorError::Decoding { .. })));
    }
    assert_eq!(a.export_state(), before);
}

// ============================================================================
// Mesh convergence
// ============================================================================

#[tokio::test]
async fn mesh_converges_on_last_writer() {
    let mesh = LoopbackMesh::new();
    let peers = [peer(1), peer(2), peer(3), peer(4)];
    for p in &peers {
        mesh.join(p).await;
    }

    for (i, p) in peers.iter().enumerate() {
        let version = 100 + i as i64;
        p.set("contended", int(i as u64), version).await.unwrap();
        p.set(format!("own-{i}"), int(i as u64), 100).await.unwrap();
    }

    let reference = peers[0].export_state().entries();
    assert_eq!(reference.len(), 5);
    for p in &peers {
        assert_eq!(p.get("contended"), Some(int(3)));
        assert_eq!(p.export_state().entries(), reference);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_local_writes_and_inbound_gossip_lose_nothing() {
    init_tracing();
    let a = peer(1);
    let b = peer(2);
    let wire = Arc::new(RecordingTransport::default());
    a.register_transport(wire.clone()).await.unwrap();

    let writers: Vec<_> = (0..4u64)
        .map(|w| {
            let a = a.clone();
            tokio::spawn(async move {
                for i in 0..25u64 {
                    a.set(format!("w{w}-{i}"), int(i), 1_000 + i as i64)
                        .await
                        .unwrap();
                }
            })
        })
        .collect();

    let gossip_source = b.clone();
    let gossip_target = a.gossiper();
    let inbound = tokio::task::spawn_blocking(move || {
        for i in 0..50u64 {
            let msg = Message::new(gossip_source.peer_id(), 1);
            msg.add(format!("remote-{i}"), int(i), 500, 0);
            let frame = msg.encode().remove(0);
            gossip_target
                .on_gossip_broadcast(gossip_source.peer_id(), &frame)
                .unwrap();
            let _ = gossip_target.on_gossip(&gossip_target.export_state().encode().remove(0));
        }
    });

    for writer in writers {
        writer.await.unwrap();
    }
    inbound.await.unwrap();

    assert_eq!(a.len(), 150);
    assert_eq!(wire.sent().len(), 100);
    for w in 0..4u64 {
        for i in 0..25u64 {
            assert_eq!(a.get(&format!("w{w}-{i}")), Some(int(i)));
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[tokio::test]
async fn peer_builds_from_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("peer.toml");
    std::fs::write(&path, "peer_id = 12\n\n[store]\nmax_entries = 2\n").unwrap();

    let config = PeerConfig::load_from_file(&path).unwrap();
    let p = rumor_peer::Peer::new(config).unwrap();
    for key in ["a", "b", "c"] {
        p.set(key, int(1), MAX_EXPIRES_AT).await.unwrap();
    }

    assert_eq!(p.peer_id(), PeerId(12));
    assert_eq!(p.len(), 2);
    assert_eq!(p.stats().evictions, 1);
    p.shutdown().await;
}

#[test]
fn missing_config_file_is_invalid_config() {
    let err = PeerConfig::load_from_file(std::path::Path::new("/nonexistent/peer.toml"))
        .unwrap_err();
    assert_eq!(err.code(), "invalid_config");
}
