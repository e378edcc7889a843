//! Store configuration

use serde::{Deserialize, Serialize};

/// Soft limit for a single profile record (5 MiB)
pub const DEFAULT_RECORD_LIMIT: usize = 5 * 1024 * 1024;

/// Soft limit for the index record (1 MiB)
pub const DEFAULT_INDEX_LIMIT: usize = 1024 * 1024;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const MIN_TIMEOUT_MS: u64 = 1_000;
pub const MAX_TIMEOUT_MS: u64 = 300_000;

/// Maximum entries kept in a profile's repository history
pub const HISTORY_CAPACITY: usize = 10;

/// Tunables for a [`crate::ProfileStore`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Largest serialized profile record accepted, in bytes
    pub record_limit_bytes: usize,
    /// Largest serialized index accepted, in bytes
    pub index_limit_bytes: usize,
    /// Timeout applied when a connection does not specify one
    pub default_timeout_ms: u64,
    pub min_timeout_ms: u64,
    pub max_timeout_ms: u64,
    pub history_capacity: usize,
    /// Buffered change notifications per subscriber
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            record_limit_bytes: DEFAULT_RECORD_LIMIT,
            index_limit_bytes: DEFAULT_INDEX_LIMIT,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            min_timeout_ms: MIN_TIMEOUT_MS,
            max_timeout_ms: MAX_TIMEOUT_MS,
            history_capacity: HISTORY_CAPACITY,
            event_capacity: 64,
        }
    }
}

impl StoreConfig {
    /// Clamp a stored timeout into the accepted range
    #[must_use]
    pub fn clamp_timeout(&self, timeout_ms: u64) -> u64 {
        timeout_ms.clamp(self.min_timeout_ms, self.max_timeout_ms)
    }

    #[must_use]
    pub fn timeout_in_range(&self, timeout_ms: u64) -> bool {
        (self.min_timeout_ms..=self.max_timeout_ms).contains(&timeout_ms)
    }
}
