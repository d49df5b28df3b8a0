//! Bounded, merge-aware cache store
//!
//! [`CacheStore`] is the local replica owned by one peer. It is safe to call
//! from any thread: local writes from the peer actor, reads from callers and
//! gossip merges from the transport all go through one internal lock.
//!
//! ## Eviction
//!
//! Entries (tombstones included) are kept in recency order. `get` and local
//! `set` mark a key as most recently used, and so does absorbing a remote
//! entry. Once `max_entries` is exceeded the least recently used entry is
//! dropped.
//!
//! ## Reads
//!
//! Tombstones and entries whose `expires_at` has passed according to the
//! store's [`Clock`] read as absent. They remain in the replicated state
//! until evicted or purged.

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use indexmap::IndexMap;
use parking_lot::Mutex;
use rumor_core::{reconcile, Entry, MergeMode, Message, PeerId, ReplicaState, Result, Value};
use std::fmt;
use std::sync::Arc;

/// Point-in-time store statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Entries held, tombstones included
    pub size: usize,
    /// Tombstones held
    pub tombstones: usize,
    /// Configured entry bound
    pub capacity: usize,
    /// Entries dropped to respect the bound since construction
    pub evictions: u64,
}

/// Recency-ordered slots; index 0 is the least recently used entry
struct Slots {
    entries: IndexMap<String, Entry>,
    capacity: usize,
    evictions: u64,
}

impl Slots {
    fn new(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity.min(1024)),
            capacity,
            evictions: 0,
        }
    }

    fn touch(&mut self, key: &str) {
        if let Some(index) = self.entries.get_index_of(key) {
            let last = self.entries.len() - 1;
            self.entries.move_index(index, last);
        }
    }

    fn put(&mut self, key: String, entry: Entry) {
        match self.entries.get_index_of(&key) {
            Some(index) => {
                self.entries[index] = entry;
                let last = self.entries.len() - 1;
                self.entries.move_index(index, last);
            }
            None => {
                self.entries.insert(key, entry);
                self.evict_overflow();
            }
        }
    }

    fn evict_overflow(&mut self) {
        while self.entries.len() > self.capacity {
            if let Some((key, _)) = self.entries.shift_remove_index(0) {
                self.evictions += 1;
                tracing::trace!(key = %key, "evicted least recently used entry");
            }
        }
    }
}

impl ReplicaState for Slots {
    fn resident(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    fn absorb(&mut self, key: String, entry: Entry) {
        self.put(key, entry);
    }

    fn for_each_resident(&self, visit: &mut dyn FnMut(&str, &Entry)) {
        for (key, entry) in &self.entries {
            visit(key, entry);
        }
    }
}

/// Bounded local replica applying last-writer-wins merges
pub struct CacheStore {
    peer_id: PeerId,
    slots: Mutex<Slots>,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    /// Create a store reading time from the system clock
    pub fn new(peer_id: PeerId, config: StoreConfig) -> Result<Self> {
        Self::with_clock(peer_id, config, Arc::new(SystemClock))
    }

    /// Create a store with an explicit time source
    pub fn with_clock(peer_id: PeerId, config: StoreConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            peer_id,
            slots: Mutex::new(Slots::new(config.max_entries)),
            clock,
        })
    }

    /// Owner of this replica
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Unconditionally install an entry (local writes)
    pub fn set(&self, key: impl Into<String>, value: Value, expires_at: i64, deleted_at: i64) {
        self.slots
            .lock()
            .put(key.into(), Entry::new(value, expires_at, deleted_at));
    }

    /// Visible value for `key`
    ///
    /// Tombstoned and expired entries read as absent.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let mut slots = self.slots.lock();
        let value = match slots.entries.get(key) {
            Some(entry) if !entry.is_tombstone() && !entry.is_expired(now) => entry.value().clone(),
            _ => return None,
        };
        slots.touch(key);
        Some(value)
    }

    /// Raw replicated entry for `key`, tombstones included
    pub fn entry(&self, key: &str) -> Option<Entry> {
        self.slots.lock().entries.get(key).cloned()
    }

    /// Replace a visible entry with a tombstone
    ///
    /// Returns the tombstone written (carrying the prior value), or `None`
    /// when nothing visible was stored under `key`. The tombstone's version
    /// is one past the entry it replaces so it wins on every replica that
    /// still holds that entry.
    ///
    /// An entry already at `i64::MAX` has no successor version. It can only
    /// arrive from a remote writer that skipped
    /// [`MAX_EXPIRES_AT`](rumor_core::MAX_EXPIRES_AT), and it is
    /// left in place: a tombstone that ties it would hide the key here and
    /// nowhere else.
    pub fn delete(&self, key: &str, deleted_at: i64) -> Option<Entry> {
        let now = self.clock.now();
        let mut slots = self.slots.lock();
        let prior = match slots.entries.get(key) {
            Some(entry) if !entry.is_tombstone() && !entry.is_expired(now) => entry.clone(),
            _ => return None,
        };

        let Some(version) = prior.expires_at().checked_add(1) else {
            tracing::warn!(
                peer = %self.peer_id,
                key = %key,
                "refusing delete: entry version has no successor"
            );
            return None;
        };
        // zero deleted_at means live
        let deleted_at = if deleted_at == 0 { 1 } else { deleted_at };
        let tombstone = Entry::tombstone(prior.value().clone(), version, deleted_at);
        slots.put(key.to_string(), tombstone.clone());

        Some(tombstone)
    }

    /// Export the full replicated state
    pub fn snapshot(&self) -> Message {
        let slots = self.slots.lock();
        Message::from_entries(self.peer_id, &slots.entries)
    }

    /// Pull merge: apply `msg` and return what its sender is missing
    pub fn merge_new(&self, msg: &Message) -> Option<Message> {
        self.merge(msg, MergeMode::New)
    }

    /// Push merge: apply `msg` and return the entries it contributed
    pub fn merge_delta(&self, msg: &Message) -> Option<Message> {
        self.merge(msg, MergeMode::Delta)
    }

    /// Unicast merge: apply `msg`
    pub fn merge_complete(&self, msg: &Message) {
        self.merge(msg, MergeMode::Complete);
    }

    fn merge(&self, msg: &Message, mode: MergeMode) -> Option<Message> {
        let incoming = msg.entries();
        let mut slots = self.slots.lock();
        reconcile(&mut *slots, self.peer_id, &incoming, mode).into_message()
    }

    /// Drop every entry whose deadline has passed; returns how many went
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut slots = self.slots.lock();
        let before = slots.entries.len();
        slots.entries.retain(|_, entry| !entry.is_expired(now));
        before - slots.entries.len()
    }

    /// Entries held, tombstones included
    pub fn len(&self) -> usize {
        self.slots.lock().entries.len()
    }

    /// Whether the store holds nothing
    pub fn is_empty(&self) -> bool {
        self.slots.lock().entries.is_empty()
    }

    /// Configured entry bound
    pub fn capacity(&self) -> usize {
        self.slots.lock().capacity
    }

    /// Current statistics
    pub fn stats(&self) -> StoreStats {
        let slots = self.slots.lock();
        StoreStats {
            size: slots.entries.len(),
            tombstones: slots.entries.values().filter(|e| e.is_tombstone()).count(),
            capacity: slots.capacity,
            evictions: slots.evictions,
        }
    }
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("peer_id", &self.peer_id)
            .field("stats", &self.stats())
            .field("clock", &self.clock)
            .finish()
    }
}
