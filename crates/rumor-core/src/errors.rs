//! Unified error type for the replication core
//!
//! Every fallible operation in the rumor crates reports a [`RumorError`].
//! Inbound decoding failures are surfaced to the transport substrate, while
//! outbound encoding failures are normally logged and suppressed by
//! [`Message::encode`](crate::Message::encode).

/// Unified error type for replication operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RumorError {
    /// Inbound bytes could not be decoded into a message
    #[error("Decoding error: {message}")]
    Decoding {
        /// Error message describing the malformed input
        message: String,
    },

    /// Local state could not be serialized
    #[error("Encoding error: {message}")]
    Encoding {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Store or peer configuration is invalid
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message describing the rejected setting
        message: String,
    },

    /// A local write carries a field the replication protocol cannot represent
    #[error("Invalid entry: {message}")]
    InvalidEntry {
        /// Error message describing the rejected field
        message: String,
    },

    /// The peer worker has shut down and accepts no more work
    #[error("Peer stopped: no further mutations are accepted")]
    PeerStopped,
}

impl RumorError {
    /// Create a decoding error
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }

    /// Create an encoding error
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid entry error
    pub fn invalid_entry(message: impl Into<String>) -> Self {
        Self::InvalidEntry {
            message: message.into(),
        }
    }

    /// Stable short code for metrics and log correlation
    pub fn code(&self) -> &'static str {
        match self {
            Self::Decoding { .. } => "decoding",
            Self::Encoding { .. } => "encoding",
            Self::InvalidConfig { .. } => "invalid_config",
            Self::InvalidEntry { .. } => "invalid_entry",
            Self::PeerStopped => "peer_stopped",
        }
    }
}

/// Standard Result type for replication operations
pub type Result<T> = std::result::Result<T, RumorError>;
