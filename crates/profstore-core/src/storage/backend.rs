//! Persistent key-value medium

use thiserror::Error;

/// Raw failure reported by a storage medium
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("{0}")]
    Other(String),
}

/// A flat string-to-string persistent store
///
/// Implementations may be shared between several [`crate::ProfileStore`]s,
/// the same way browser tabs share one origin's storage.
pub trait KeyValueBackend: Send + Sync {
    /// Read a value
    ///
    /// # Errors
    /// Returns an error if the medium cannot be read
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Write a value, replacing any previous one
    ///
    /// # Errors
    /// Returns an error if the medium is full or cannot be written
    fn set_item(&self, key: &str, value: &str) -> Result<(), BackendError>;

    /// Remove a value; removing a missing key is not an error
    ///
    /// # Errors
    /// Returns an error if the medium cannot be written
    fn remove_item(&self, key: &str) -> Result<(), BackendError>;

    /// List every key currently stored
    ///
    /// # Errors
    /// Returns an error if the medium cannot be read
    fn keys(&self) -> Result<Vec<String>, BackendError>;
}
