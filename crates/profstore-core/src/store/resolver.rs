//! Default profile resolution
//!
//! Precedence for the active profile, first hit wins:
//! 1. an explicit id from the caller's navigation context, if it names a
//!    readable profile
//! 2. the stored default pointer, if it names an indexed profile
//! 3. the first index entry flagged default
//! 4. the first index entry
//! 5. a bootstrapped profile, when there are none at all

use super::{domain_failure, ProfileStore};
use crate::error::{
    ErrorContext, ProfileError, ProfileErrorKind, StorageError, StoreError, StoreResult,
};
use crate::events::ChangeKind;
use crate::profile::{LegacySettings, Profile, ProfileId};
use crate::storage::keys::DEFAULT_POINTER_KEY;

impl ProfileStore {
    /// Decide which profile is active
    ///
    /// # Errors
    /// Returns an error if the medium fails or a bootstrap profile cannot be
    /// created
    pub fn resolve_active_profile_id(&self, url_override: Option<&str>) -> StoreResult<ProfileId> {
        if let Some(id) = url_override.map(str::trim).filter(|id| !id.is_empty()) {
            match self.records().load(id) {
                Ok(Some(profile)) => return Ok(profile.id),
                Ok(None) => tracing::debug!(profile_id = id, "Requested profile does not exist"),
                Err(StoreError::Storage(e)) if !matches!(e, StorageError::InvalidData { .. }) => {
                    return Err(e.into());
                }
                Err(e) => tracing::warn!(profile_id = id, error = %e, "Requested profile is unreadable"),
            }
        }

        let entries = self.list()?;

        if let Some(pointer) = self.default_pointer()? {
            if let Some(entry) = entries.iter().find(|e| e.id.as_str() == pointer) {
                return Ok(entry.id.clone());
            }
            tracing::warn!(profile_id = %pointer, "Default pointer names a missing profile");
        }

        if let Some(entry) = entries.iter().find(|e| e.is_default).or_else(|| entries.first()) {
            return Ok(entry.id.clone());
        }

        Ok(self.bootstrap_from_legacy_settings()?.id)
    }

    /// The active profile, with its credential opened
    ///
    /// # Errors
    /// Returns the resolution error, or the read error for the resolved id
    pub fn active_profile(&self, url_override: Option<&str>) -> StoreResult<Profile> {
        let id = self.resolve_active_profile_id(url_override)?;
        self.get(id.as_str())?
            .ok_or_else(|| ProfileError::not_found(id.as_str(), "active_profile").into())
    }

    /// Make `id` the only default profile
    ///
    /// Writes the pointer, flags the target, unflags every other profile
    /// that is flagged, then rebuilds the index. Running it on a store with
    /// zero or several flagged profiles leaves exactly one.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown id, or the storage error that
    /// stopped one of the writes
    pub fn set_default(&self, id: &str) -> StoreResult<()> {
        let ctx = ErrorContext::new("set_default").with_profile(id);
        let records = self.records();
        let mut target = records
            .load(id)?
            .ok_or_else(|| ProfileError::not_found(id, "set_default"))?;

        self.kv.set(DEFAULT_POINTER_KEY, target.id.as_str())?;

        if !target.is_default {
            target.is_default = true;
            records
                .save(&target)
                .map_err(|e| domain_failure(e, ProfileErrorKind::UpdateFailed, &ctx))?;
        }

        for mut other in records.scan()?.profiles {
            if other.id != target.id && other.is_default {
                other.is_default = false;
                records
                    .save(&other)
                    .map_err(|e| domain_failure(e, ProfileErrorKind::UpdateFailed, &ctx))?;
                tracing::debug!(profile_id = %other.id, "Cleared stale default flag");
            }
        }

        tracing::info!(profile_id = %target.id, "Default profile set");
        self.refresh_index("set_default", &target.id);
        self.publish(ChangeKind::DefaultChanged, Some(&target.id));
        Ok(())
    }

    /// Stored default pointer
    ///
    /// # Errors
    /// Returns an error if the medium cannot be read
    pub fn default_pointer(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .kv
            .get(DEFAULT_POINTER_KEY)?
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()))
    }

    /// Create the first profile from legacy flat settings
    ///
    /// Only creates when no readable profile exists; otherwise the first
    /// profile in index order is returned.
    ///
    /// # Errors
    /// Returns an error if the medium fails or the profile cannot be created
    pub fn bootstrap_from_legacy_settings(&self) -> StoreResult<Profile> {
        let current = self.index().compute()?;
        if let Some(first) = current.entries.first() {
            tracing::debug!(profile_id = %first.id, "Profiles exist, skipping bootstrap");
            return self
                .get(first.id.as_str())?
                .ok_or_else(|| ProfileError::not_found(first.id.as_str(), "bootstrap").into());
        }

        let settings = LegacySettings::read(&self.kv);
        if settings.is_empty() {
            tracing::info!("No profiles or legacy settings, creating default profile");
        } else {
            tracing::info!("Creating first profile from legacy settings");
        }
        self.create(settings.into_request(&self.config))
    }

    pub(super) fn clear_default_pointer(&self, id: &str) -> StoreResult<()> {
        if self.default_pointer()?.as_deref() == Some(id) {
            self.kv.remove(DEFAULT_POINTER_KEY)?;
            self.publish(ChangeKind::DefaultChanged, None);
        }
        Ok(())
    }

    /// Hand the default to the surviving pointer target, or else to the
    /// next profile in index order
    pub(super) fn reassign_default(&self, removed: &ProfileId) {
        let entries = match self.index().compute() {
            Ok(report) => report.entries,
            Err(e) => {
                tracing::warn!(profile_id = %removed, error = %e, "Cannot scan profiles to reassign default");
                return;
            }
        };
        let pointer = self.default_pointer().ok().flatten();
        let next = entries
            .iter()
            .filter(|e| &e.id != removed)
            .find(|e| Some(e.id.as_str()) == pointer.as_deref())
            .or_else(|| entries.iter().find(|e| &e.id != removed));

        match next {
            Some(entry) => {
                if let Err(e) = self.set_default(entry.id.as_str()) {
                    tracing::warn!(profile_id = %entry.id, error = %e, "Failed to reassign default profile");
                }
            }
            None => tracing::debug!("Last profile deleted, no default to reassign"),
        }
    }
}
