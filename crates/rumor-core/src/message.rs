//! Gossip message: a peer identity plus a key → entry map
//!
//! A [`Message`] is both the unit exchanged between peers and the unit folded
//! together by the merge engine. It is a mutable accumulator: entries can be
//! added while another thread encodes it for transmission, so all access to
//! the entry map goes through a lock scoped to the instance.
//!
//! ## Lock discipline
//!
//! No method holds two message locks at once. Merging snapshots the source
//! before locking the destination, so `m.merge(&m)` and crossed concurrent
//! merges (`a.merge(&b)` racing `b.merge(&a)`) cannot deadlock.

use crate::entry::{Entry, PeerId, Value};
use crate::errors::Result;
use crate::merge::{reconcile, MergeMode};
use crate::wire;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Storage hint used when a caller passes zero
pub const DEFAULT_ENTRY_HINT: usize = 5;

/// Gossip payload exchanged and merged between peers
pub struct Message {
    peer_id: PeerId,
    entries: Mutex<HashMap<String, Entry>>,
}

impl Message {
    /// Create an empty message, pre-sized for `size_hint` entries
    pub fn new(peer_id: PeerId, size_hint: usize) -> Self {
        let hint = if size_hint == 0 {
            DEFAULT_ENTRY_HINT
        } else {
            size_hint
        };
        Self {
            peer_id,
            entries: Mutex::new(HashMap::with_capacity(hint)),
        }
    }

    /// Create a message holding a copy of `entries`
    pub fn from_entries<'a, I>(peer_id: PeerId, entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a Entry)>,
    {
        let copied: HashMap<String, Entry> = entries
            .into_iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();
        Self {
            peer_id,
            entries: Mutex::new(copied),
        }
    }

    /// Decode a wire frame
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        wire::deserialize_message(bytes)
    }

    /// Identity of the peer this message describes
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Upsert one entry
    pub fn add(&self, key: impl Into<String>, value: Value, expires_at: i64, deleted_at: i64) {
        self.entries
            .lock()
            .insert(key.into(), Entry::new(value, expires_at, deleted_at));
    }

    /// Look up the entry for `key`
    pub fn get(&self, key: &str) -> Option<Entry> {
        self.entries.lock().get(key).cloned()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the message carries no entries
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Sorted list of keys
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Point-in-time copy of the entry map
    pub fn entries(&self) -> BTreeMap<String, Entry> {
        self.entries
            .lock()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    /// Serialize into transmissible frames
    ///
    /// Always a single frame today, but consumers must accept any number.
    /// Encoding failures are logged and yield no frames: gossip is lossy and
    /// later rounds repair whatever this one failed to send.
    pub fn encode(&self) -> Vec<Vec<u8>> {
        match self.try_encode() {
            Ok(frames) => frames,
            Err(e) => {
                tracing::warn!(peer = %self.peer_id, error = %e, "failed to encode message");
                Vec::new()
            }
        }
    }

    /// Serialize into transmissible frames, surfacing encoding failures
    pub fn try_encode(&self) -> Result<Vec<Vec<u8>>> {
        let snapshot = self.entries();
        let frame = wire::serialize_entries(self.peer_id, &snapshot)?;
        Ok(vec![frame])
    }

    /// Fold `other` into this message in place
    pub fn merge_from(&self, other: &Message) {
        let incoming = other.entries();
        let mut entries = self.entries.lock();
        reconcile(&mut *entries, self.peer_id, &incoming, MergeMode::Complete);
    }

    /// Fold `other` into this message and return the reconciled result
    ///
    /// The result carries this message's identity, not the sender's: it is
    /// "my current view", ready to be re-exported.
    pub fn merge(&self, other: &Message) -> Message {
        self.merge_from(other);
        self.clone()
    }
}

impl Clone for Message {
    fn clone(&self) -> Self {
        Self {
            peer_id: self.peer_id,
            entries: Mutex::new(self.entries.lock().clone()),
        }
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.peer_id == other.peer_id && self.entries() == other.entries()
    }
}

impl Eq for Message {}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("peer_id", &self.peer_id)
            .field("entries", &self.entries())
            .finish()
    }
}
