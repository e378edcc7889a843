//! Primary record access
//!
//! Every read decodes, validates, and migrates. A migrated record is
//! written back once so later reads see the current shape.

use serde_json::Value;

use super::codec;
use super::migrate::migrate_record_if_needed;
use super::types::Profile;
use crate::config::StoreConfig;
use crate::error::{ErrorContext, ProfileError, StorageError, StoreError, StoreResult};
use crate::storage::keys::{profile_id_from_key, profile_key, PROFILE_PREFIX};
use crate::storage::KvAdapter;

/// Result of scanning every primary record
#[derive(Debug, Default)]
pub struct Scan {
    pub profiles: Vec<Profile>,
    /// Keys whose records could not be read as profiles
    pub corrupted: Vec<String>,
}

#[derive(Clone, Copy)]
pub struct Records<'a> {
    kv: &'a KvAdapter,
    config: &'a StoreConfig,
}

impl<'a> Records<'a> {
    #[must_use]
    pub fn new(kv: &'a KvAdapter, config: &'a StoreConfig) -> Self {
        Self { kv, config }
    }

    /// Load a profile by id
    ///
    /// # Errors
    /// Returns a storage error if the medium fails or the bytes are not JSON,
    /// and `InvalidData` if the record fails shape checks
    pub fn load(&self, id: &str) -> StoreResult<Option<Profile>> {
        self.load_key(&profile_key(id))
    }

    /// Whether a primary record exists for `id`, readable or not
    ///
    /// # Errors
    /// Returns an error if the medium cannot be read
    pub fn exists(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.kv.get(&profile_key(id))?.is_some())
    }

    /// # Errors
    /// Returns an error if the profile cannot be serialized or written
    pub fn save(&self, profile: &Profile) -> StoreResult<()> {
        let encoded = codec::encode(profile)?;
        self.kv.set(&profile_key(profile.id.as_str()), &encoded)?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if the medium cannot be written
    pub fn remove(&self, id: &str) -> Result<(), StorageError> {
        self.kv.remove(&profile_key(id))
    }

    /// Read every primary record, setting aside the ones that are corrupted
    ///
    /// # Errors
    /// Returns an error only if the medium itself fails
    pub fn scan(&self) -> Result<Scan, StorageError> {
        let mut scan = Scan::default();

        for key in self.kv.keys_with_prefix(PROFILE_PREFIX)? {
            if profile_id_from_key(&key).is_none() {
                continue;
            }
            match self.load_key(&key) {
                Ok(Some(profile)) => scan.profiles.push(profile),
                // Removed between listing and reading
                Ok(None) => {}
                Err(StoreError::Storage(StorageError::InvalidData { message, .. })) => {
                    tracing::warn!(key = %key, error = %message, "Skipping unparseable profile record");
                    scan.corrupted.push(key);
                }
                Err(StoreError::Storage(e)) => return Err(e),
                Err(StoreError::Profile(e)) => {
                    tracing::warn!(key = %key, error = %e, "Skipping corrupted profile record");
                    scan.corrupted.push(key);
                }
            }
        }

        Ok(scan)
    }

    fn load_key(&self, key: &str) -> StoreResult<Option<Profile>> {
        let Some(value) = self.kv.get_json::<Value>(key)? else {
            return Ok(None);
        };

        let record = codec::decode(&value, self.config).map_err(|mut e| {
            e.context.key = Some(key.to_string());
            e
        })?;
        // A record filed under another id's key would be written back under its own
        let stored_id = record.profile().id.as_str();
        if profile_id_from_key(key) != Some(stored_id) {
            return Err(ProfileError::invalid_data(
                format!("Profile record id '{stored_id}' does not match its key"),
                ErrorContext::new("load").with_profile(stored_id).with_key(key),
            )
            .into());
        }
        let migrated = migrate_record_if_needed(record);

        if migrated.changed {
            if let Err(e) = self.save(&migrated.profile) {
                tracing::warn!(key, error = %e, "Failed to persist migrated profile record");
            }
        }

        Ok(Some(migrated.profile))
    }
}
