//! Peer configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! peer_id = 42
//! mailbox_capacity = 64
//!
//! [store]
//! max_entries = 4096
//! ```

use rumor_core::{PeerId, Result, RumorError};
use rumor_store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default depth of the actor's command queue
pub const DEFAULT_MAILBOX_CAPACITY: usize = 64;

fn default_mailbox_capacity() -> usize {
    DEFAULT_MAILBOX_CAPACITY
}

/// Configuration for one [`Peer`](crate::Peer)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    /// Identity of this peer in the gossip mesh
    pub peer_id: PeerId,
    /// Pending local mutations before callers wait for queue space
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
    /// Local store bounds
    #[serde(default)]
    pub store: StoreConfig,
}

impl PeerConfig {
    /// Default configuration for `peer_id`
    pub fn new(peer_id: PeerId) -> Self {
        Self {
            peer_id,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            store: StoreConfig::default(),
        }
    }

    /// Override the store's entry bound
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.store.max_entries = max_entries;
        self
    }

    /// Override the command queue depth
    pub fn with_mailbox_capacity(mut self, mailbox_capacity: usize) -> Self {
        self.mailbox_capacity = mailbox_capacity;
        self
    }

    /// Reject configurations a peer cannot be built from
    pub fn validate(&self) -> Result<()> {
        if self.mailbox_capacity == 0 {
            return Err(RumorError::invalid_config(
                "mailbox_capacity must be greater than zero",
            ));
        }
        self.store.validate()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| RumorError::invalid_config(format!("Invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RumorError::invalid_config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }
}
