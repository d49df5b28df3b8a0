//! DAG-CBOR serialization for gossip payloads
//!
//! DAG-CBOR is the single codec used for wire frames and for typed values
//! stored through [`Value::encode`](crate::Value::encode). Map keys are
//! emitted in canonical order, so equal messages encode to equal bytes.

use crate::errors::{Result, RumorError};
use serde::{Deserialize, Serialize};

/// Serialize any serde-compatible type to DAG-CBOR bytes
pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_ipld_dagcbor::to_vec(value)
        .map_err(|e| RumorError::encoding(format!("Failed to serialize to DAG-CBOR: {e}")))
}

/// Deserialize DAG-CBOR bytes to any serde-compatible type
pub fn from_slice<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    serde_ipld_dagcbor::from_slice(bytes)
        .map_err(|e| RumorError::decoding(format!("Failed to deserialize DAG-CBOR: {e}")))
}
