//! Profile types

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::timestamp;

/// Opaque, immutable profile identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    /// Allocate a fresh identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProfileId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProfileId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ProfileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Current time at the precision records are stored with
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Endpoint and credential used when talking to the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub endpoint: String,
    /// Plaintext or sealed credential; opaque to the store
    #[serde(default, alias = "apiKey", skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    pub timeout_ms: u64,
    pub enabled: bool,
}

/// Default environment variable passed to sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EnvironmentVariable {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            description: None,
        }
    }
}

/// A repository recently used with a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryUsage {
    pub repository: String,
    #[serde(with = "timestamp")]
    pub last_used: DateTime<Utc>,
}

/// A named connection profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Organization scopes usable when creating sessions, in order, unique
    #[serde(default)]
    pub fixed_organizations: Vec<String>,
    pub connection: Connection,
    /// Duplicate keys are allowed and passed through
    #[serde(default)]
    pub environment_variables: Vec<EnvironmentVariable>,
    /// Most recent first, unique by repository, bounded
    #[serde(default)]
    pub repository_history: Vec<RepositoryUsage>,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Time this profile was last used, falling back to its last update
    #[must_use]
    pub fn last_used(&self) -> DateTime<Utc> {
        self.repository_history
            .iter()
            .map(|h| h.last_used)
            .max()
            .unwrap_or(self.updated_at)
    }
}

/// Row of the derived profile index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileIndexEntry {
    pub id: ProfileId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    pub is_default: bool,
    #[serde(with = "timestamp")]
    pub last_used: DateTime<Utc>,
    pub repository_count: usize,
}

impl From<&Profile> for ProfileIndexEntry {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            description: profile.description.clone(),
            icon: profile.icon.clone(),
            accent_color: profile.accent_color.clone(),
            is_default: profile.is_default,
            last_used: profile.last_used(),
            repository_count: profile.repository_history.len(),
        }
    }
}

/// Connection settings supplied when creating a profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSettings {
    pub endpoint: String,
    #[serde(default, alias = "apiKey")]
    pub credential: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl ConnectionSettings {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }
}

/// Request to create a profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub accent_color: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub fixed_organizations: Vec<String>,
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub environment_variables: Vec<EnvironmentVariable>,
    #[serde(default)]
    pub is_default: bool,
}

impl CreateProfileRequest {
    #[must_use]
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connection: ConnectionSettings::new(endpoint),
            ..Self::default()
        }
    }
}

/// Connection fields to change; omitted fields keep their stored values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionUpdate {
    pub endpoint: Option<String>,
    /// `Some("")` clears the credential
    pub credential: Option<String>,
    pub timeout_ms: Option<u64>,
    pub enabled: Option<bool>,
}

impl ConnectionUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoint.is_none()
            && self.credential.is_none()
            && self.timeout_ms.is_none()
            && self.enabled.is_none()
    }
}

/// Partial update of a profile
///
/// Optional text fields are trimmed; an empty value clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub accent_color: Option<String>,
    pub system_prompt: Option<String>,
    pub fixed_organizations: Option<Vec<String>>,
    pub connection: Option<ConnectionUpdate>,
    pub environment_variables: Option<Vec<EnvironmentVariable>>,
    pub is_default: Option<bool>,
}
