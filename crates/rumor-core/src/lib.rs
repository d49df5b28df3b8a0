#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
//! # Rumor Core - Replicated State and Merge
//!
//! The leaf layer of the gossip cache:
//! - [`Entry`]: immutable state of one replicated key
//! - [`Message`]: lock-guarded gossip payload (peer identity + entry map)
//! - [`merge`]: deterministic last-writer-wins reconciliation
//! - [`wire`]: single-frame DAG-CBOR envelope
//!
//! ## Design Principles
//!
//! - **Commutative and idempotent merge**: delivery order and duplication
//!   never change the converged state
//! - **Expiry as version**: `expires_at` decides conflicts, ties keep the
//!   resident entry
//! - **Tombstones replicate**: deletions are entries too and travel like any
//!   other write

pub mod entry;
pub mod errors;
pub mod merge;
pub mod message;
pub mod serialization;
pub mod wire;

pub use entry::{Entry, PeerId, Value, MAX_EXPIRES_AT};
pub use errors::{Result, RumorError};
pub use merge::{reconcile, MergeDelta, MergeMode, ReplicaState};
pub use message::{Message, DEFAULT_ENTRY_HINT};
