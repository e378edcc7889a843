//! Create, update, delete

use super::{domain_failure, ProfileStore};
use crate::error::{ErrorContext, ProfileError, ProfileErrorKind, StoreResult};
use crate::events::ChangeKind;
use crate::profile::{
    history, now, validate, Connection, CreateProfileRequest, Profile, ProfileId, ProfileUpdate,
};
use crate::storage::keys::DEFAULT_POINTER_KEY;

impl ProfileStore {
    /// Create a profile
    ///
    /// A requested default that cannot be applied is logged; the profile is
    /// still returned, not flagged.
    ///
    /// # Errors
    /// Returns `ValidationFailed` for an empty name or endpoint or an
    /// out-of-range timeout, or the storage error that stopped the write
    pub fn create(&self, request: CreateProfileRequest) -> StoreResult<Profile> {
        let ctx = ErrorContext::new("create");
        let name = validate::name(&request.name, &ctx)?;
        let endpoint = validate::endpoint(&request.connection.endpoint, &ctx)?;
        let timeout_ms = validate::timeout(request.connection.timeout_ms, &self.config, &ctx)?;

        let id = ProfileId::generate();
        let ctx = ctx.with_profile(id.as_str());
        let credential = self.seal_credential(
            validate::optional_text(request.connection.credential.as_deref()),
            &ctx,
        )?;

        let ts = now();
        let profile = Profile {
            id: id.clone(),
            name,
            description: validate::optional_text(request.description.as_deref()),
            icon: validate::optional_text(request.icon.as_deref()),
            accent_color: validate::optional_text(request.accent_color.as_deref()),
            system_prompt: validate::optional_text(request.system_prompt.as_deref()),
            fixed_organizations: validate::organizations(&request.fixed_organizations),
            connection: Connection {
                endpoint,
                credential,
                timeout_ms,
                enabled: request.connection.enabled.unwrap_or(true),
            },
            environment_variables: request.environment_variables,
            repository_history: Vec::new(),
            is_default: false,
            created_at: ts,
            updated_at: ts,
        };

        self.records()
            .save(&profile)
            .map_err(|e| domain_failure(e, ProfileErrorKind::CreationFailed, &ctx))?;
        tracing::info!(profile_id = %id, name = %profile.name, "Profile created");
        self.refresh_index("create", &id);
        self.publish(ChangeKind::Created, Some(&id));

        // The record is already written, so a failed default switch is not fatal
        if request.is_default {
            if let Err(e) = self.set_default(id.as_str()) {
                tracing::warn!(profile_id = %id, error = %e, "Profile created but not made default");
            }
        }

        self.get(id.as_str())?.ok_or_else(|| {
            ProfileError::new(
                ProfileErrorKind::CreationFailed,
                "Profile disappeared after it was written",
                ctx,
            )
            .into()
        })
    }

    /// Apply a partial update
    ///
    /// Nothing is written unless every changed field validates.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown id, `ValidationFailed` for an
    /// invalid field, or the storage error that stopped the write
    pub fn update(&self, id: &str, update: ProfileUpdate) -> StoreResult<Profile> {
        let ctx = ErrorContext::new("update").with_profile(id);
        let mut profile = self
            .records()
            .load(id)?
            .ok_or_else(|| ProfileError::not_found(id, "update"))?;

        if let Some(name) = &update.name {
            profile.name = validate::name(name, &ctx)?;
        }
        if let Some(description) = &update.description {
            profile.description = validate::optional_text(Some(description));
        }
        if let Some(icon) = &update.icon {
            profile.icon = validate::optional_text(Some(icon));
        }
        if let Some(accent_color) = &update.accent_color {
            profile.accent_color = validate::optional_text(Some(accent_color));
        }
        if let Some(system_prompt) = &update.system_prompt {
            profile.system_prompt = validate::optional_text(Some(system_prompt));
        }
        if let Some(orgs) = &update.fixed_organizations {
            profile.fixed_organizations = validate::organizations(orgs);
        }
        if let Some(vars) = update.environment_variables {
            profile.environment_variables = vars;
        }
        if let Some(conn) = update.connection {
            // Merged field by field; omitted fields keep their stored values
            if let Some(endpoint) = &conn.endpoint {
                profile.connection.endpoint = validate::endpoint(endpoint, &ctx)?;
            }
            if let Some(timeout_ms) = conn.timeout_ms {
                profile.connection.timeout_ms =
                    validate::timeout(Some(timeout_ms), &self.config, &ctx)?;
            }
            if let Some(enabled) = conn.enabled {
                profile.connection.enabled = enabled;
            }
            if let Some(credential) = &conn.credential {
                profile.connection.credential =
                    self.seal_credential(validate::optional_text(Some(credential)), &ctx)?;
            }
        }
        if update.is_default == Some(false) {
            profile.is_default = false;
        }
        profile.updated_at = now().max(profile.updated_at);

        self.records()
            .save(&profile)
            .map_err(|e| domain_failure(e, ProfileErrorKind::UpdateFailed, &ctx))?;
        tracing::debug!(profile_id = %profile.id, "Profile updated");
        self.refresh_index("update", &profile.id);
        self.publish(ChangeKind::Updated, Some(&profile.id));

        match update.is_default {
            Some(true) => self.set_default(id)?,
            Some(false) => self.clear_default_pointer(id)?,
            None => {}
        }

        self.get(id)?.ok_or_else(|| {
            ProfileError::new(
                ProfileErrorKind::UpdateFailed,
                "Profile disappeared while it was being updated",
                ctx,
            )
            .into()
        })
    }

    /// Delete a profile
    ///
    /// Returns `false` if there was nothing to delete. Deleting the default
    /// profile hands the default to the next profile in index order.
    ///
    /// # Errors
    /// Returns the storage error that stopped the delete
    pub fn delete(&self, id: &str) -> StoreResult<bool> {
        let ctx = ErrorContext::new("delete").with_profile(id);
        let records = self.records();
        if !records.exists(id)? {
            return Ok(false);
        }

        let pointer = self.default_pointer()?;
        let pointed_at = pointer.as_deref() == Some(id);
        // A corrupted record can still be deleted; it just cannot be default
        let flagged = matches!(records.load(id), Ok(Some(p)) if p.is_default);

        records.remove(id)?;
        if records.exists(id)? {
            return Err(ProfileError::new(
                ProfileErrorKind::DeleteFailed,
                "Profile record is still present after removal",
                ctx,
            )
            .into());
        }
        tracing::info!(profile_id = id, "Profile deleted");

        if pointed_at {
            if let Err(e) = self.kv.remove(DEFAULT_POINTER_KEY) {
                tracing::warn!(profile_id = id, error = %e, "Failed to clear default pointer");
            }
        }
        let deleted = ProfileId::from(id);
        self.refresh_index("delete", &deleted);
        self.publish(ChangeKind::Deleted, Some(&deleted));

        if pointed_at || flagged {
            self.reassign_default(&deleted);
        }

        Ok(true)
    }

    /// Copy a profile under a new id
    ///
    /// The copy starts with no history and is never default.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown id, `ValidationFailed` for an empty
    /// name, or the storage error that stopped the write
    pub fn duplicate(&self, id: &str, name: Option<&str>) -> StoreResult<Profile> {
        let ctx = ErrorContext::new("duplicate").with_profile(id);
        let source = self
            .records()
            .load(id)?
            .ok_or_else(|| ProfileError::not_found(id, "duplicate"))?;

        let name = match name {
            Some(name) => validate::name(name, &ctx)?,
            None => format!("{} (copy)", source.name),
        };

        let ts = now();
        let copy = Profile {
            id: ProfileId::generate(),
            name,
            repository_history: Vec::new(),
            is_default: false,
            created_at: ts,
            updated_at: ts,
            ..source
        };

        self.records()
            .save(&copy)
            .map_err(|e| domain_failure(e, ProfileErrorKind::CreationFailed, &ctx))?;
        self.refresh_index("duplicate", &copy.id);
        self.publish(ChangeKind::Created, Some(&copy.id));

        self.get(copy.id.as_str())?.ok_or_else(|| {
            ProfileError::new(
                ProfileErrorKind::CreationFailed,
                "Profile disappeared after it was written",
                ctx,
            )
            .into()
        })
    }

    /// Record that `repository` was used with a profile
    ///
    /// # Errors
    /// Returns `ValidationFailed` for an empty repository, `NotFound` for an
    /// unknown id, or the storage error that stopped the write
    pub fn record_repository_usage(&self, id: &str, repository: &str) -> StoreResult<Profile> {
        let ctx = ErrorContext::new("record_repository_usage").with_profile(id);
        let repository = repository.trim();
        if repository.is_empty() {
            return Err(ProfileError::validation("Repository cannot be empty", ctx).into());
        }

        let mut profile = self
            .records()
            .load(id)?
            .ok_or_else(|| ProfileError::not_found(id, "record_repository_usage"))?;
        history::record_usage(
            &mut profile.repository_history,
            repository,
            now(),
            self.config.history_capacity,
        );

        self.records()
            .save(&profile)
            .map_err(|e| domain_failure(e, ProfileErrorKind::UpdateFailed, &ctx))?;
        self.refresh_index("record_repository_usage", &profile.id);
        self.publish(ChangeKind::Updated, Some(&profile.id));

        self.get(id)?
            .ok_or_else(|| ProfileError::not_found(id, "record_repository_usage").into())
    }
}
