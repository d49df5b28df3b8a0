//! Gossip wire format helpers.
//!
//! A message travels as a single DAG-CBOR frame:
//! `{ peer_id, entries: { key: { value, expires_at, deleted_at } } }`.
//! Frames are not chunked and carry no schema version.

use crate::entry::{Entry, PeerId, Value};
use crate::errors::Result;
use crate::message::Message;
use crate::serialization;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize)]
struct WireEntryRef<'a> {
    value: &'a serde_bytes::Bytes,
    expires_at: i64,
    deleted_at: i64,
}

#[derive(Serialize)]
struct WireMessageRef<'a> {
    peer_id: PeerId,
    entries: BTreeMap<&'a str, WireEntryRef<'a>>,
}

#[derive(Deserialize)]
struct WireEntry {
    value: serde_bytes::ByteBuf,
    expires_at: i64,
    deleted_at: i64,
}

#[derive(Deserialize)]
struct WireMessage {
    peer_id: PeerId,
    entries: BTreeMap<String, WireEntry>,
}

/// Serialize a peer identity and entry map into one frame
pub fn serialize_entries(peer_id: PeerId, entries: &BTreeMap<String, Entry>) -> Result<Vec<u8>> {
    let wire = WireMessageRef {
        peer_id,
        entries: entries
            .iter()
            .map(|(key, entry)| {
                (
                    key.as_str(),
                    WireEntryRef {
                        value: serde_bytes::Bytes::new(entry.value().as_bytes()),
                        expires_at: entry.expires_at(),
                        deleted_at: entry.deleted_at(),
                    },
                )
            })
            .collect(),
    };
    serialization::to_vec(&wire)
}

/// Deserialize one frame into a message
pub fn deserialize_message(bytes: &[u8]) -> Result<Message> {
    let wire: WireMessage = serialization::from_slice(bytes)?;
    let entries: BTreeMap<String, Entry> = wire
        .entries
        .into_iter()
        .map(|(key, e)| {
            let entry = Entry::new(Value::from(e.value.into_vec()), e.expires_at, e.deleted_at);
            (key, entry)
        })
        .collect();
    Ok(Message::from_entries(wire.peer_id, &entries))
}
