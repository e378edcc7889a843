//! Profile export/import format
//!
//! An export is the profile document with the credential replaced by
//! [`REDACTED_CREDENTIAL`], plus a format version and export time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::codec;
use super::migrate::organization_of;
use super::timestamp;
use super::types::{ConnectionSettings, CreateProfileRequest, Profile, ProfileUpdate};
use super::validate;
use crate::error::{ErrorContext, ProfileError};

/// Version of the export format
pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// Placeholder written instead of a credential
pub const REDACTED_CREDENTIAL: &str = "[REDACTED]";

/// Exported profile document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileExport {
    /// Format version for future compatibility
    pub export_version: u32,
    #[serde(with = "timestamp")]
    pub exported_at: DateTime<Utc>,
    #[serde(flatten)]
    pub profile: Profile,
}

impl ProfileExport {
    /// Export a copy of `profile` with the credential redacted
    #[must_use]
    pub fn redacted(profile: &Profile) -> Self {
        let mut profile = profile.clone();
        if profile.connection.credential.is_some() {
            profile.connection.credential = Some(REDACTED_CREDENTIAL.to_string());
        }
        Self {
            export_version: EXPORT_FORMAT_VERSION,
            exported_at: super::types::now(),
            profile,
        }
    }

    /// # Errors
    /// Returns an error if the export cannot be serialized
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// What an import will create: the core request, then the supplementary
/// fields reapplied as an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPlan {
    pub request: CreateProfileRequest,
    pub supplement: ProfileUpdate,
}

impl ImportPlan {
    #[must_use]
    pub fn has_supplement(&self) -> bool {
        self.supplement != ProfileUpdate::default()
    }
}

/// Summary of a document before importing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub name: String,
    pub description: Option<String>,
    pub endpoint: String,
    pub environment_variable_count: usize,
    pub organization_count: usize,
    pub has_credential: bool,
}

/// Parse an exported document into an import plan
///
/// # Errors
/// Returns `ValidationFailed` if the document is not JSON, is from a newer
/// format version, or lacks a name or connection
pub fn parse_import(serialized: &str) -> Result<ImportPlan, ProfileError> {
    let ctx = ErrorContext::new("import");
    let value: Value = serde_json::from_str(serialized)
        .map_err(|e| ProfileError::validation(format!("Import is not valid JSON: {e}"), ctx.clone()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| ProfileError::validation("Import must be a JSON object", ctx.clone()))?;

    if let Some(version) = obj.get("exportVersion").and_then(Value::as_u64) {
        if version > u64::from(EXPORT_FORMAT_VERSION) {
            return Err(ProfileError::validation(
                format!("Unsupported export format version: {version}"),
                ctx,
            ));
        }
    }

    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ProfileError::validation("Import is missing a profile name", ctx.clone()))?;
    let connection = obj
        .get("connection")
        .and_then(Value::as_object)
        .ok_or_else(|| ProfileError::validation("Import is missing a connection", ctx.clone()))?;

    let request = CreateProfileRequest {
        name: name.to_string(),
        description: text(obj, "description"),
        icon: text(obj, "icon"),
        accent_color: text(obj, "accentColor"),
        system_prompt: None,
        fixed_organizations: Vec::new(),
        connection: import_connection(connection),
        environment_variables: Vec::new(),
        is_default: false,
    };

    let supplement = ProfileUpdate {
        system_prompt: text(obj, "systemPrompt"),
        fixed_organizations: import_organizations(obj),
        environment_variables: obj
            .get("environmentVariables")
            .map(codec::environment_variables)
            .filter(|vars| !vars.is_empty()),
        ..ProfileUpdate::default()
    };

    Ok(ImportPlan {
        request,
        supplement,
    })
}

/// Summarize a document without importing it
///
/// # Errors
/// Returns the same errors as [`parse_import`]
pub fn preview_import(serialized: &str) -> Result<ImportPreview, ProfileError> {
    let plan = parse_import(serialized)?;
    Ok(ImportPreview {
        name: plan.request.name.trim().to_string(),
        description: plan.request.description,
        endpoint: plan.request.connection.endpoint,
        environment_variable_count: plan
            .supplement
            .environment_variables
            .as_ref()
            .map_or(0, Vec::len),
        organization_count: plan.supplement.fixed_organizations.as_ref().map_or(0, Vec::len),
        has_credential: plan.request.connection.credential.is_some(),
    })
}

fn import_connection(obj: &Map<String, Value>) -> ConnectionSettings {
    ConnectionSettings {
        endpoint: obj
            .get("endpoint")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        // A redacted export carries no usable secret
        credential: obj
            .get("credential")
            .or_else(|| obj.get("apiKey"))
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty() && *c != REDACTED_CREDENTIAL)
            .map(ToString::to_string),
        timeout_ms: obj
            .get("timeoutMs")
            .or_else(|| obj.get("timeout"))
            .and_then(Value::as_u64),
        enabled: obj.get("enabled").and_then(Value::as_bool),
    }
}

fn import_organizations(obj: &Map<String, Value>) -> Option<Vec<String>> {
    let mut orgs: Vec<String> = obj
        .get("fixedOrganizations")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(Value::as_str).map(ToString::to_string).collect())
        .unwrap_or_default();

    // Documents exported by older releases name repositories instead
    if let Some(repo) = obj.get("fixedRepository").and_then(Value::as_str) {
        orgs.extend(organization_of(repo));
    }
    if let Some(repos) = obj.get("fixedRepositories").and_then(Value::as_array) {
        orgs.extend(repos.iter().filter_map(Value::as_str).filter_map(organization_of));
    }

    let orgs = validate::organizations(&orgs);
    (!orgs.is_empty()).then_some(orgs)
}

fn text(obj: &Map<String, Value>, field: &str) -> Option<String> {
    validate::optional_text(obj.get(field).and_then(Value::as_str))
}
