//! Peer actor
//!
//! Every locally initiated mutation is funnelled through one worker task so
//! that "mutate the store, build the delta, broadcast it" runs as a unit with
//! respect to other local mutations. The queue carries typed [`Command`]s;
//! callers await a oneshot completion signal.
//!
//! Reads and inbound gossip do not use the queue (see [`GossipAdapter`]).
//!
//! ## Lifecycle
//!
//! The worker stops when [`Peer::shutdown`] is called or when the last
//! [`Peer`] handle is dropped. Commands still queued at that point are
//! discarded and their callers observe [`RumorError::PeerStopped`].

use crate::config::PeerConfig;
use crate::gossip::GossipAdapter;
use crate::transport::{GossipTransport, Gossiper};
use parking_lot::Mutex;
use rumor_core::{Message, PeerId, Result, RumorError, Value, MAX_EXPIRES_AT};
use rumor_store::{CacheStore, Clock, StoreStats, SystemClock};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Unit of work drained by the peer worker
enum Command {
    Set {
        key: String,
        value: Value,
        expires_at: i64,
        done: oneshot::Sender<()>,
    },
    Delete {
        key: String,
        deleted_at: i64,
        done: oneshot::Sender<bool>,
    },
    RegisterTransport {
        transport: Arc<dyn GossipTransport>,
        done: oneshot::Sender<()>,
    },
}

/// State owned by the worker task
struct Worker {
    peer_id: PeerId,
    store: Arc<CacheStore>,
    transport: Option<Arc<dyn GossipTransport>>,
}

impl Worker {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::debug!(peer = %self.peer_id, "peer worker started");
        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
            }
        }
        tracing::debug!(peer = %self.peer_id, "peer worker stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Set {
                key,
                value,
                expires_at,
                done,
            } => {
                self.store.set(key.clone(), value.clone(), expires_at, 0);

                let msg = Message::new(self.peer_id, 1);
                msg.add(key, value, expires_at, 0);
                self.broadcast(msg).await;

                let _ = done.send(());
            }
            Command::Delete {
                key,
                deleted_at,
                done,
            } => {
                let existed = match self.store.delete(&key, deleted_at) {
                    Some(tombstone) => {
                        let msg = Message::new(self.peer_id, 1);
                        msg.add(
                            key,
                            tombstone.value().clone(),
                            tombstone.expires_at(),
                            tombstone.deleted_at(),
                        );
                        self.broadcast(msg).await;
                        true
                    }
                    None => false,
                };
                let _ = done.send(existed);
            }
            Command::RegisterTransport { transport, done } => {
                self.transport = Some(transport);
                tracing::debug!(peer = %self.peer_id, "transport registered");
                let _ = done.send(());
            }
        }
    }

    async fn broadcast(&self, msg: Message) {
        match &self.transport {
            Some(transport) => transport.broadcast(msg).await,
            None => {
                tracing::trace!(
                    peer = %self.peer_id,
                    keys = ?msg.keys(),
                    "no transport registered, dropping broadcast"
                );
            }
        }
    }
}

/// Handle to a running peer
///
/// Cheap to clone; all clones drive the same worker and store.
#[derive(Clone)]
pub struct Peer {
    peer_id: PeerId,
    store: Arc<CacheStore>,
    gossip: GossipAdapter,
    commands: mpsc::Sender<Command>,
    shutdown: Arc<watch::Sender<bool>>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Peer {
    /// Build a peer and start its worker on the current tokio runtime
    pub fn new(config: PeerConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build a peer whose store reads time from `clock`
    pub fn with_clock(config: PeerConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            RumorError::invalid_config(format!("peer requires a running tokio runtime: {e}"))
        })?;

        let peer_id = config.peer_id;
        let store = Arc::new(CacheStore::with_clock(peer_id, config.store, clock)?);
        let (commands, inbox) = mpsc::channel(config.mailbox_capacity);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let worker = Worker {
            peer_id,
            store: store.clone(),
            transport: None,
        };
        let handle = runtime.spawn(worker.run(inbox, shutdown_rx));

        Ok(Self {
            peer_id,
            gossip: GossipAdapter::new(peer_id, store.clone()),
            store,
            commands,
            shutdown: Arc::new(shutdown),
            worker: Arc::new(Mutex::new(Some(handle))),
        })
    }

    /// Identity of this peer
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Write `key` locally and broadcast it; resolves once both are done
    ///
    /// `expires_at` may be at most [`MAX_EXPIRES_AT`] so that a later delete
    /// can still outrank the write on every replica.
    pub async fn set(&self, key: impl Into<String>, value: Value, expires_at: i64) -> Result<()> {
        if expires_at > MAX_EXPIRES_AT {
            return Err(RumorError::invalid_entry(format!(
                "expires_at {expires_at} exceeds the latest deletable deadline {MAX_EXPIRES_AT}"
            )));
        }
        let (done, completed) = oneshot::channel();
        self.submit(Command::Set {
            key: key.into(),
            value,
            expires_at,
            done,
        })
        .await?;
        completed.await.map_err(|_| RumorError::PeerStopped)
    }

    /// Tombstone `key` locally and broadcast the deletion
    ///
    /// Returns whether a visible entry existed. Nothing is broadcast when it
    /// did not.
    pub async fn delete(&self, key: impl Into<String>, deleted_at: i64) -> Result<bool> {
        let (done, completed) = oneshot::channel();
        self.submit(Command::Delete {
            key: key.into(),
            deleted_at,
            done,
        })
        .await?;
        completed.await.map_err(|_| RumorError::PeerStopped)
    }

    /// Read the visible value for `key`, bypassing the queue
    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.get(key)
    }

    /// Install the outbound broadcast handle
    ///
    /// Broadcasts issued before this completes are silently dropped.
    pub async fn register_transport(&self, transport: Arc<dyn GossipTransport>) -> Result<()> {
        let (done, completed) = oneshot::channel();
        self.submit(Command::RegisterTransport { transport, done })
            .await?;
        completed.await.map_err(|_| RumorError::PeerStopped)
    }

    /// Substrate-facing callbacks for this peer
    pub fn gossiper(&self) -> GossipAdapter {
        self.gossip.clone()
    }

    /// Entries held locally, tombstones included
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the local store is empty
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Local store statistics
    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Whether shutdown has been requested
    pub fn is_stopped(&self) -> bool {
        *self.shutdown.borrow() || self.commands.is_closed()
    }

    /// Stop the worker and wait for it to exit
    ///
    /// Later mutations fail with [`RumorError::PeerStopped`].
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(peer = %self.peer_id, error = %e, "peer worker ended abnormally");
            }
        }
    }

    async fn submit(&self, command: Command) -> Result<()> {
        if *self.shutdown.borrow() {
            return Err(RumorError::PeerStopped);
        }
        self.commands
            .send(command)
            .await
            .map_err(|_| RumorError::PeerStopped)
    }
}

impl Gossiper for Peer {
    fn export_state(&self) -> Message {
        self.gossip.export_state()
    }

    fn on_gossip(&self, update: &[u8]) -> Result<Option<Message>> {
        self.gossip.on_gossip(update)
    }

    fn on_gossip_broadcast(&self, src: PeerId, update: &[u8]) -> Result<Option<Message>> {
        self.gossip.on_gossip_broadcast(src, update)
    }

    fn on_gossip_unicast(&self, src: PeerId, update: &[u8]) -> Result<()> {
        self.gossip.on_gossip_unicast(src, update)
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("peer_id", &self.peer_id)
            .field("stats", &self.stats())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
