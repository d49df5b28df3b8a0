//! Cache store configuration.

use rumor_core::{Result, RumorError};
use serde::{Deserialize, Serialize};

/// Default entry bound
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

/// Bounds for a [`CacheStore`](crate::CacheStore)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum number of entries, tombstones included
    pub max_entries: usize,
}

impl StoreConfig {
    /// Config with the given entry bound
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self { max_entries }
    }

    /// Reject configurations a store cannot be built from
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(RumorError::invalid_config(
                "store max_entries must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}
