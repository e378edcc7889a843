//! Export and import

use super::ProfileStore;
use crate::error::{ErrorContext, ProfileError, StoreResult};
use crate::profile::export::{parse_import, preview_import};
use crate::profile::{ImportPreview, Profile, ProfileExport};

impl ProfileStore {
    /// Export a profile as JSON with its credential redacted
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown id, or the read error
    pub fn export(&self, id: &str) -> StoreResult<String> {
        let profile = self
            .records()
            .load(id)?
            .ok_or_else(|| ProfileError::not_found(id, "export"))?;
        let json = ProfileExport::redacted(&profile).to_json().map_err(|e| {
            ProfileError::invalid_data(
                format!("Failed to serialize export: {e}"),
                ErrorContext::new("export").with_profile(id),
            )
        })?;
        tracing::debug!(profile_id = id, "Profile exported");
        Ok(json)
    }

    /// Import an exported profile as a new, non-default profile
    ///
    /// The imported profile gets a fresh id and empty history.
    ///
    /// # Errors
    /// Returns `ValidationFailed` for a malformed document, or the error from
    /// creating the profile
    pub fn import(&self, serialized: &str) -> StoreResult<Profile> {
        let plan = parse_import(serialized)?;
        let has_supplement = plan.has_supplement();
        let profile = self.create(plan.request)?;
        if !has_supplement {
            return Ok(profile);
        }
        let profile = self.update(profile.id.as_str(), plan.supplement)?;
        tracing::info!(profile_id = %profile.id, "Profile imported");
        Ok(profile)
    }

    /// Summarize a document without importing it
    ///
    /// # Errors
    /// Returns `ValidationFailed` for a malformed document
    pub fn preview_import(&self, serialized: &str) -> StoreResult<ImportPreview> {
        Ok(preview_import(serialized)?)
    }
}
