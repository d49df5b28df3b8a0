//! Replicated entry model
//!
//! An [`Entry`] is the replicated state of one key. Its `expires_at` doubles
//! as the version marker for last-writer-wins reconciliation, and a non-zero
//! `deleted_at` marks it as a tombstone.

use crate::errors::Result;
use crate::serialization;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Latest deadline a local write may carry
///
/// The last representable version is left free so that deleting an entry
/// can always write a tombstone that strictly supersedes it.
pub const MAX_EXPIRES_AT: i64 = i64::MAX - 1;

/// Identifier of a participating peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub u64);

impl PeerId {
    /// Create a peer identifier from its raw value
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric identifier
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for PeerId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Opaque cached payload
///
/// Cloning a value shares the underlying buffer.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Value(Arc<[u8]>);

impl Value {
    /// Encode a typed payload with the wire codec
    pub fn encode<T: Serialize>(payload: &T) -> Result<Self> {
        serialization::to_vec(payload).map(Self::from)
    }

    /// Decode a payload previously stored with [`Value::encode`]
    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        serialization::from_slice(&self.0)
    }

    /// Raw payload bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(text) => write!(f, "Value({text:?})"),
            Err(_) => write!(f, "Value({} bytes)", self.0.len()),
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().into())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::from(text.into_bytes())
    }
}

impl AsRef<[u8]> for Value {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// State of a single replicated key
///
/// Entries are never mutated in place; an update installs a replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    value: Value,
    expires_at: i64,
    deleted_at: i64,
}

impl Entry {
    /// Create an entry from all of its parts
    pub fn new(value: Value, expires_at: i64, deleted_at: i64) -> Self {
        Self {
            value,
            expires_at,
            deleted_at,
        }
    }

    /// Create a live entry
    pub fn live(value: Value, expires_at: i64) -> Self {
        Self::new(value, expires_at, 0)
    }

    /// Create a tombstone recording a delete issued at `deleted_at`
    pub fn tombstone(value: Value, expires_at: i64, deleted_at: i64) -> Self {
        Self::new(value, expires_at, deleted_at)
    }

    /// Cached payload
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Expiration deadline, also the LWW version marker
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Delete timestamp, zero for live entries
    pub fn deleted_at(&self) -> i64 {
        self.deleted_at
    }

    /// Whether this entry records a deletion
    pub fn is_tombstone(&self) -> bool {
        self.deleted_at != 0
    }

    /// Whether the deadline has passed at `now`
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    /// Last-writer-wins: strictly greater `expires_at` wins, ties keep the resident entry
    pub fn supersedes(&self, resident: &Entry) -> bool {
        self.expires_at > resident.expires_at
    }
}
