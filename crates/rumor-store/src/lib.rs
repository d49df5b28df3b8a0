#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
//! # Rumor Store - Bounded Local Replica
//!
//! The per-peer cache consulted and mutated by the peer actor and the gossip
//! adapter. It applies the same last-writer-wins rule as
//! [`rumor_core::merge`] when absorbing remote messages and reports back
//! which entries were novel, so callers can build anti-entropy replies and
//! relay deltas.

pub mod clock;
pub mod config;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{StoreConfig, DEFAULT_MAX_ENTRIES};
pub use store::{CacheStore, StoreStats};
