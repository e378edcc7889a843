//! Record codec and shape validation
//!
//! Decoding accepts every shape a profile record has been stored in and
//! classifies it into a [`RawRecord`] variant. Shape checks are minimal: a
//! record needs a non-empty `id`, a non-empty `name`, and a `connection`
//! object. Anything less is `InvalidData`; the record is never patched up
//! into a usable profile.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::history;
use super::timestamp;
use super::types::{Connection, EnvironmentVariable, Profile, ProfileId, RepositoryUsage};
use super::validate;
use crate::config::StoreConfig;
use crate::error::{ErrorContext, ProfileError};

/// A decoded record, tagged by the schema generation it was stored with
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    /// Oldest shape: a single `fixedRepository: "org/repo"`, possibly
    /// alongside a `fixedRepositories` list
    SingleRepository {
        profile: Profile,
        fixed_repository: Value,
        fixed_repositories: Option<Value>,
    },
    /// `fixedRepositories: ["org/repo", ...]`
    RepositoryList {
        profile: Profile,
        fixed_repositories: Value,
    },
    /// `fixedOrganizations`, no legacy fields
    Current(Profile),
}

impl RawRecord {
    #[must_use]
    pub fn profile(&self) -> &Profile {
        match self {
            Self::SingleRepository { profile, .. }
            | Self::RepositoryList { profile, .. }
            | Self::Current(profile) => profile,
        }
    }

    #[must_use]
    pub fn into_profile(self) -> Profile {
        match self {
            Self::SingleRepository { profile, .. }
            | Self::RepositoryList { profile, .. }
            | Self::Current(profile) => profile,
        }
    }

    #[must_use]
    pub fn is_current(&self) -> bool {
        matches!(self, Self::Current(_))
    }
}

impl From<Profile> for RawRecord {
    fn from(profile: Profile) -> Self {
        Self::Current(profile)
    }
}

/// Decode a stored JSON value into a classified record
///
/// # Errors
/// Returns `InvalidData` if the value lacks an id, a name, or a connection
pub fn decode(raw: &Value, config: &StoreConfig) -> Result<RawRecord, ProfileError> {
    let ctx = ErrorContext::new("decode");
    let obj = raw
        .as_object()
        .ok_or_else(|| ProfileError::invalid_data("Profile record is not an object", ctx.clone()))?;

    let id = required_text(obj, "id")
        .ok_or_else(|| ProfileError::invalid_data("Profile record has no id", ctx.clone()))?;
    let ctx = ctx.with_profile(&id);
    let name = required_text(obj, "name")
        .ok_or_else(|| ProfileError::invalid_data("Profile record has no name", ctx.clone()))?;
    let connection = obj
        .get("connection")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            ProfileError::invalid_data("Profile record has no connection object", ctx.clone())
        })?;

    let created_at = obj
        .get("createdAt")
        .and_then(timestamp::parse_value)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let updated_at = obj
        .get("updatedAt")
        .and_then(timestamp::parse_value)
        .unwrap_or(created_at);

    let fixed_organizations = obj
        .get("fixedOrganizations")
        .and_then(Value::as_array)
        .map(|orgs| {
            let names: Vec<&str> = orgs.iter().filter_map(Value::as_str).collect();
            validate::organizations(&names)
        })
        .unwrap_or_default();

    let profile = Profile {
        id: ProfileId::from(id),
        name,
        description: optional_text(obj, "description"),
        icon: optional_text(obj, "icon"),
        accent_color: optional_text(obj, "accentColor"),
        system_prompt: optional_text(obj, "systemPrompt"),
        fixed_organizations,
        connection: decode_connection(connection, config),
        environment_variables: obj
            .get("environmentVariables")
            .map(environment_variables)
            .unwrap_or_default(),
        repository_history: obj
            .get("repositoryHistory")
            .map(|h| repository_history(h, config.history_capacity))
            .unwrap_or_default(),
        is_default: obj.get("isDefault").and_then(Value::as_bool).unwrap_or(false),
        created_at,
        updated_at,
    };

    let fixed_repository = obj.get("fixedRepository").filter(|v| !v.is_null()).cloned();
    let fixed_repositories = obj.get("fixedRepositories").filter(|v| !v.is_null()).cloned();

    Ok(match (fixed_repository, fixed_repositories) {
        (Some(fixed_repository), fixed_repositories) => RawRecord::SingleRepository {
            profile,
            fixed_repository,
            fixed_repositories,
        },
        (None, Some(fixed_repositories)) => RawRecord::RepositoryList {
            profile,
            fixed_repositories,
        },
        (None, None) => RawRecord::Current(profile),
    })
}

/// Serialize a profile for storage
///
/// # Errors
/// Returns `InvalidData` if the profile cannot be serialized
pub fn encode(profile: &Profile) -> Result<String, ProfileError> {
    serde_json::to_string(profile).map_err(|e| {
        ProfileError::invalid_data(
            format!("Failed to serialize profile: {e}"),
            ErrorContext::new("encode").with_profile(profile.id.as_str()),
        )
    })
}

fn decode_connection(obj: &Map<String, Value>, config: &StoreConfig) -> Connection {
    let timeout_ms = obj
        .get("timeoutMs")
        .or_else(|| obj.get("timeout"))
        .and_then(Value::as_u64)
        .map_or(config.default_timeout_ms, |t| config.clamp_timeout(t));

    Connection {
        endpoint: obj
            .get("endpoint")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        credential: obj
            .get("credential")
            .or_else(|| obj.get("apiKey"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string),
        timeout_ms,
        enabled: obj.get("enabled").and_then(Value::as_bool).unwrap_or(true),
    }
}

/// Read environment variables from a list of `{key, value, description?}`
/// or a flat `{KEY: VALUE}` map. Malformed entries are dropped.
pub(crate) fn environment_variables(value: &Value) -> Vec<EnvironmentVariable> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let key = item.get("key")?.as_str()?;
                let value = item.get("value")?.as_str()?;
                Some(EnvironmentVariable {
                    key: key.to_string(),
                    value: value.to_string(),
                    description: item
                        .get("description")
                        .and_then(Value::as_str)
                        .map(ToString::to_string),
                })
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .filter_map(|(k, v)| Some(EnvironmentVariable::new(k.clone(), v.as_str()?)))
            .collect(),
        _ => Vec::new(),
    }
}

/// Any entry that cannot be read discards the whole history
fn repository_history(value: &Value, capacity: usize) -> Vec<RepositoryUsage> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    let parsed: Option<Vec<RepositoryUsage>> = items
        .iter()
        .map(|item| {
            Some(RepositoryUsage {
                repository: item.get("repository")?.as_str()?.to_string(),
                last_used: timestamp::parse_value(item.get("lastUsed")?)?,
            })
        })
        .collect();

    match parsed {
        Some(history) => history::normalize(history, capacity),
        None => {
            tracing::warn!(
                entries = items.len(),
                "Discarding unreadable repository history"
            );
            Vec::new()
        }
    }
}

fn required_text(obj: &Map<String, Value>, field: &str) -> Option<String> {
    obj.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn optional_text(obj: &Map<String, Value>, field: &str) -> Option<String> {
    validate::optional_text(obj.get(field).and_then(Value::as_str))
}
