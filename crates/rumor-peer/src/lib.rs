#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
//! # Rumor Peer - Actor and Gossip Callbacks
//!
//! A [`Peer`] owns one bounded [`CacheStore`](rumor_store::CacheStore) and
//! exposes two faces:
//!
//! - **Local API** (`set`, `delete`, `register_transport`): serialized
//!   through a single worker task so that mutate-then-broadcast is atomic
//!   with respect to other local mutations.
//! - **Substrate API** ([`Gossiper`]): pull, push and unicast callbacks that
//!   merge inbound frames straight into the store, concurrently with each
//!   other and with the worker.
//!
//! `get` reads the store directly and never waits on the queue.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rumor_core::{PeerId, Value, MAX_EXPIRES_AT};
//! use rumor_peer::{Peer, PeerConfig};
//!
//! # async fn example() -> Result<(), rumor_core::RumorError> {
//! let peer = Peer::new(PeerConfig::new(PeerId(1)))?;
//! peer.set("greeting", Value::from("hello"), MAX_EXPIRES_AT).await?;
//! assert!(peer.get("greeting").is_some());
//! peer.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod config;
pub mod gossip;
pub mod transport;

pub use actor::Peer;
pub use config::{PeerConfig, DEFAULT_MAILBOX_CAPACITY};
pub use gossip::GossipAdapter;
pub use transport::{GossipTransport, Gossiper};
