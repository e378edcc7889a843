//! Fallible, size-checked access to the storage medium
//!
//! Every call returns a typed [`StorageError`]; nothing here panics on a
//! medium failure. Writes are measured before they reach the medium so an
//! oversized value fails predictably instead of relying on the medium's own
//! quota handling.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use super::backend::{BackendError, KeyValueBackend};
use super::keys::INDEX_KEY;
use crate::config::StoreConfig;
use crate::error::StorageError;

#[derive(Clone)]
pub struct KvAdapter {
    backend: Arc<dyn KeyValueBackend>,
    record_limit: usize,
    index_limit: usize,
}

impl KvAdapter {
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueBackend>, config: &StoreConfig) -> Self {
        Self {
            backend,
            record_limit: config.record_limit_bytes,
            index_limit: config.index_limit_bytes,
        }
    }

    /// # Errors
    /// Returns an error if the medium cannot be read
    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.backend
            .get_item(key)
            .map_err(|e| translate("get", key, e))
    }

    /// # Errors
    /// Returns `QuotaExceeded` if the value is over the soft limit for `key`
    /// (nothing is written), or the translated medium failure
    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let limit = self.limit_for(key);
        let size = estimate_size(value);
        if size > limit {
            tracing::warn!(key, size, limit, "Rejecting oversized write");
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                message: format!("value is {size} bytes, limit is {limit} bytes"),
            });
        }

        self.backend
            .set_item(key, value)
            .map_err(|e| translate("set", key, e))
    }

    /// # Errors
    /// Returns an error if the medium cannot be written
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.backend
            .remove_item(key)
            .map_err(|e| translate("remove", key, e))
    }

    /// # Errors
    /// Returns an error if the medium cannot be enumerated
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys: Vec<String> = self
            .backend
            .keys()
            .map_err(|e| translate("keys", prefix, e))?
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Read and parse a JSON value
    ///
    /// # Errors
    /// Returns `InvalidData` if the stored text is not valid JSON for `T`
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StorageError::InvalidData {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Serialize and write a JSON value
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails
    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value).map_err(|e| StorageError::OperationFailed {
            operation: "serialize",
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.set(key, &json)
    }

    fn limit_for(&self, key: &str) -> usize {
        if key == INDEX_KEY {
            self.index_limit
        } else {
            self.record_limit
        }
    }
}

/// Estimated stored size of a value in bytes
#[must_use]
pub fn estimate_size(value: &str) -> usize {
    value.len()
}

fn translate(operation: &'static str, key: &str, err: BackendError) -> StorageError {
    let key = key.to_string();
    match err {
        BackendError::QuotaExceeded(message) => StorageError::QuotaExceeded { key, message },
        BackendError::AccessDenied(message) => StorageError::AccessDenied { key, message },
        BackendError::Other(message) => StorageError::OperationFailed {
            operation,
            key,
            message,
        },
    }
}
