//! Profile store
//!
//! The only writer path to profile storage. Every mutation writes the
//! primary record first and then rebuilds the index; the record is the
//! source of truth, so an index failure after a successful write is logged
//! and left for a later rebuild.

mod crud;
mod resolver;
mod transfer;

use std::sync::Arc;

use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::{ErrorContext, ProfileError, ProfileErrorKind, StoreError, StoreResult};
use crate::events::{ChangeEvent, ChangeKind, ChangeNotifier};
use crate::profile::records::Records;
use crate::profile::{IndexMaintainer, Profile, ProfileId, ProfileIndexEntry, RebuildReport};
use crate::storage::{CredentialCipher, KeyValueBackend, KvAdapter, PlaintextCipher};

pub struct ProfileStore {
    kv: KvAdapter,
    config: StoreConfig,
    cipher: Arc<dyn CredentialCipher>,
    notifier: ChangeNotifier,
    origin: Uuid,
}

impl ProfileStore {
    /// Create a store over `backend` with default settings
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    #[must_use]
    pub fn with_config(backend: Arc<dyn KeyValueBackend>, config: StoreConfig) -> Self {
        let notifier = ChangeNotifier::new(config.event_capacity);
        Self {
            kv: KvAdapter::new(backend, &config),
            config,
            cipher: Arc::new(PlaintextCipher),
            notifier,
            origin: Uuid::new_v4(),
        }
    }

    /// Seal credentials with `cipher` before they are stored
    #[must_use]
    pub fn with_cipher(mut self, cipher: Arc<dyn CredentialCipher>) -> Self {
        self.cipher = cipher;
        self
    }

    /// Publish changes on a channel shared with other stores
    #[must_use]
    pub fn with_notifier(mut self, notifier: ChangeNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Identifier carried in this store's change events
    #[must_use]
    pub fn origin(&self) -> Uuid {
        self.origin
    }

    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ChangeEvent> {
        self.notifier.subscribe()
    }

    /// Get a profile by id
    ///
    /// The returned copy carries the opened credential.
    ///
    /// # Errors
    /// Returns an error if the record cannot be read, is corrupted, or its
    /// credential cannot be opened
    pub fn get(&self, id: &str) -> StoreResult<Option<Profile>> {
        let Some(mut profile) = self.records().load(id)? else {
            return Ok(None);
        };
        profile.connection.credential = self.open_credential(&profile, "get")?;
        Ok(Some(profile))
    }

    /// Credential of a profile, opened
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown id, or the read error
    pub fn credentials(&self, id: &str) -> StoreResult<Option<String>> {
        let profile = self
            .records()
            .load(id)?
            .ok_or_else(|| ProfileError::not_found(id, "credentials"))?;
        self.open_credential(&profile, "credentials")
    }

    /// List profiles in index order
    ///
    /// # Errors
    /// Returns an error if the medium fails
    pub fn list(&self) -> StoreResult<Vec<ProfileIndexEntry>> {
        Ok(self.index().read_or_rebuild()?)
    }

    /// Rebuild the index from the primary records
    ///
    /// # Errors
    /// Returns an error if the medium fails
    pub fn rebuild_index(&self) -> StoreResult<RebuildReport> {
        let report = self.index().rebuild()?;
        self.publish(ChangeKind::IndexRebuilt, None);
        Ok(report)
    }

    fn records(&self) -> Records<'_> {
        Records::new(&self.kv, &self.config)
    }

    fn index(&self) -> IndexMaintainer<'_> {
        IndexMaintainer::new(self.records(), &self.kv)
    }

    /// Rebuild after a successful write; failures do not undo the write
    fn refresh_index(&self, method: &'static str, id: &ProfileId) {
        if let Err(e) = self.index().rebuild() {
            tracing::warn!(method, profile_id = %id, error = %e, "Index rebuild failed after write");
        }
    }

    fn publish(&self, kind: ChangeKind, profile_id: Option<&ProfileId>) {
        self.notifier.publish(ChangeEvent {
            origin: self.origin,
            kind,
            profile_id: profile_id.cloned(),
        });
    }

    fn seal_credential(
        &self,
        credential: Option<String>,
        ctx: &ErrorContext,
    ) -> Result<Option<String>, ProfileError> {
        credential
            .map(|c| {
                self.cipher.seal(&c).map_err(|e| {
                    ProfileError::invalid_data(format!("Failed to seal credential: {e}"), ctx.clone())
                })
            })
            .transpose()
    }

    fn open_credential(&self, profile: &Profile, method: &'static str) -> StoreResult<Option<String>> {
        let Some(stored) = profile.connection.credential.as_deref() else {
            return Ok(None);
        };
        self.cipher.open(stored).map(Some).map_err(|e| {
            ProfileError::invalid_data(
                format!("Failed to open credential: {e}"),
                ErrorContext::new(method).with_profile(profile.id.as_str()),
            )
            .into()
        })
    }
}

/// Storage failures pass through; domain failures are re-labelled for the
/// operation that hit them
fn domain_failure(err: StoreError, kind: ProfileErrorKind, ctx: &ErrorContext) -> StoreError {
    match err {
        StoreError::Storage(e) => StoreError::Storage(e),
        StoreError::Profile(e) => ProfileError::new(kind, e.message, ctx.clone()).into(),
    }
}
