//! Stable identity of a query.

use crate::error::FilterError;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex SHA-256 of the canonical JSON form of a query's parts.
///
/// Canonical means object keys sorted (serde_json's default map), so two
/// structurally equal queries hash alike regardless of field order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey(String);

impl DedupKey {
    /// Hashes any serializable description of a query.
    pub fn new<T: Serialize + ?Sized>(parts: &T) -> Result<Self, FilterError> {
        let canonical = serde_json::to_value(parts)
            .and_then(|value| serde_json::to_vec(&value))
            .map_err(|e| FilterError::Internal(format!("query is not serializable: {}", e)))?;

        let digest = Sha256::digest(&canonical);
        Ok(Self(
            digest.iter().map(|byte| format!("{:02x}", byte)).collect(),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    /// Abbreviated for log lines.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0[..12.min(self.0.len())])
    }
}
