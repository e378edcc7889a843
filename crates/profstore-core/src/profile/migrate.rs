//! One-shot record migrations and the legacy settings bootstrap
//!
//! Each schema step is a pure function from one [`RawRecord`] generation to
//! the next. Steps only ever move forward, so migrating a current record is
//! a no-op.

use serde_json::Value;

use super::codec::{self, RawRecord};
use super::types::{ConnectionSettings, CreateProfileRequest, Profile};
use super::validate;
use crate::error::{ErrorContext, ProfileError, ProfileErrorKind};
use crate::storage::keys::legacy;
use crate::storage::KvAdapter;

/// Endpoint used when bootstrapping without any legacy settings
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080";

/// Name given to a bootstrapped profile
pub const BOOTSTRAP_PROFILE_NAME: &str = "Default";

/// Result of migrating one record
#[derive(Debug, Clone, PartialEq)]
pub struct Migrated {
    pub profile: Profile,
    /// Whether the stored record needs rewriting
    pub changed: bool,
}

/// Bring a record to the current shape
///
/// A failing step does not fail the read: the profile is returned with no
/// organizations and `changed == false`, leaving the stored record as it was.
#[must_use]
pub fn migrate_record_if_needed(record: RawRecord) -> Migrated {
    if let RawRecord::Current(profile) = record {
        return Migrated {
            profile,
            changed: false,
        };
    }

    let fallback = record.profile().clone();
    match run_steps(record) {
        Ok(profile) => {
            tracing::info!(profile_id = %profile.id, "Migrated legacy profile record");
            Migrated {
                profile,
                changed: true,
            }
        }
        Err(e) => {
            tracing::warn!(
                profile_id = %fallback.id,
                error = %e,
                "Profile migration failed, continuing without organizations"
            );
            Migrated {
                profile: Profile {
                    fixed_organizations: Vec::new(),
                    ..fallback
                },
                changed: false,
            }
        }
    }
}

fn run_steps(mut record: RawRecord) -> Result<Profile, ProfileError> {
    loop {
        record = match record {
            RawRecord::SingleRepository {
                profile,
                fixed_repository,
                fixed_repositories,
            } => single_to_list(profile, &fixed_repository, fixed_repositories.as_ref())?,
            RawRecord::RepositoryList {
                profile,
                fixed_repositories,
            } => list_to_organizations(profile, &fixed_repositories)?,
            RawRecord::Current(profile) => return Ok(profile),
        };
    }
}

/// `fixedRepository: "org/repo"` becomes a one-element repository list
fn single_to_list(
    profile: Profile,
    fixed_repository: &Value,
    fixed_repositories: Option<&Value>,
) -> Result<RawRecord, ProfileError> {
    let single = fixed_repository
        .as_str()
        .ok_or_else(|| migration_error(&profile, "fixedRepository is not a string"))?;

    let mut list = vec![Value::String(single.to_string())];
    if let Some(existing) = fixed_repositories {
        let existing = existing
            .as_array()
            .ok_or_else(|| migration_error(&profile, "fixedRepositories is not a list"))?;
        list.extend(existing.iter().cloned());
    }

    Ok(RawRecord::RepositoryList {
        profile,
        fixed_repositories: Value::Array(list),
    })
}

/// `fixedRepositories` becomes the set of owning organizations
fn list_to_organizations(
    mut profile: Profile,
    fixed_repositories: &Value,
) -> Result<RawRecord, ProfileError> {
    let repositories = fixed_repositories
        .as_array()
        .ok_or_else(|| migration_error(&profile, "fixedRepositories is not a list"))?;

    let mut organizations = profile.fixed_organizations.clone();
    for repository in repositories {
        let repository = repository
            .as_str()
            .ok_or_else(|| migration_error(&profile, "repository entry is not a string"))?;
        organizations.push(organization_of(repository).ok_or_else(|| {
            migration_error(&profile, &format!("no organization in '{repository}'"))
        })?);
    }

    profile.fixed_organizations = validate::organizations(&organizations);
    Ok(RawRecord::Current(profile))
}

/// Organization part of `org/repo`; a bare name is its own organization
#[must_use]
pub fn organization_of(repository: &str) -> Option<String> {
    let org = repository.trim().split('/').next().unwrap_or_default().trim();
    (!org.is_empty()).then(|| org.to_string())
}

fn migration_error(profile: &Profile, message: &str) -> ProfileError {
    ProfileError::new(
        ProfileErrorKind::MigrationFailed,
        message,
        ErrorContext::new("migrate_record_if_needed").with_profile(profile.id.as_str()),
    )
}

/// Flat settings stored before profiles existed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacySettings {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_ms: Option<u64>,
    pub system_prompt: Option<String>,
    pub environment_variables: Option<Value>,
    pub fixed_repository: Option<String>,
}

impl LegacySettings {
    /// Read whatever legacy settings exist; unreadable keys are skipped
    #[must_use]
    pub fn read(kv: &KvAdapter) -> Self {
        Self {
            endpoint: read_text(kv, legacy::ENDPOINT),
            api_key: read_text(kv, legacy::API_KEY),
            timeout_ms: read_text(kv, legacy::TIMEOUT).and_then(|t| match t.parse() {
                Ok(ms) => Some(ms),
                Err(_) => {
                    tracing::warn!(key = legacy::TIMEOUT, value = %t, "Ignoring malformed legacy timeout");
                    None
                }
            }),
            system_prompt: read_text(kv, legacy::SYSTEM_PROMPT),
            environment_variables: read_text(kv, legacy::ENVIRONMENT_VARIABLES).and_then(|raw| {
                match serde_json::from_str(&raw) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!(key = legacy::ENVIRONMENT_VARIABLES, error = %e, "Ignoring malformed legacy environment variables");
                        None
                    }
                }
            }),
            fixed_repository: read_text(kv, legacy::FIXED_REPOSITORY),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Build the request that creates the bootstrap profile
    ///
    /// Out-of-range timeouts are dropped so the default applies.
    #[must_use]
    pub fn into_request(self, config: &crate::config::StoreConfig) -> CreateProfileRequest {
        CreateProfileRequest {
            name: BOOTSTRAP_PROFILE_NAME.to_string(),
            description: None,
            icon: None,
            accent_color: None,
            system_prompt: self.system_prompt,
            fixed_organizations: self
                .fixed_repository
                .as_deref()
                .and_then(organization_of)
                .into_iter()
                .collect(),
            connection: ConnectionSettings {
                endpoint: self
                    .endpoint
                    .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
                credential: self.api_key,
                timeout_ms: self.timeout_ms.filter(|t| config.timeout_in_range(*t)),
                enabled: Some(true),
            },
            environment_variables: self
                .environment_variables
                .as_ref()
                .map(codec::environment_variables)
                .unwrap_or_default(),
            is_default: true,
        }
    }
}

fn read_text(kv: &KvAdapter, key: &str) -> Option<String> {
    match kv.get(key) {
        Ok(value) => value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()),
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read legacy setting");
            None
        }
    }
}
