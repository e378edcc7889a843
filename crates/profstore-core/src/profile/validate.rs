//! Input validation and normalization for profile fields

use crate::config::StoreConfig;
use crate::error::{ErrorContext, ProfileError};

/// Trim a required display name
///
/// # Errors
/// Returns `ValidationFailed` if the name is empty or whitespace
pub fn name(raw: &str, ctx: &ErrorContext) -> Result<String, ProfileError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ProfileError::validation(
            "Profile name cannot be empty",
            ctx.clone(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Trim a required endpoint URL
///
/// # Errors
/// Returns `ValidationFailed` if the endpoint is empty or whitespace
pub fn endpoint(raw: &str, ctx: &ErrorContext) -> Result<String, ProfileError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ProfileError::validation(
            "Connection endpoint cannot be empty",
            ctx.clone(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Apply the default timeout or check an explicit one against the bounds
///
/// # Errors
/// Returns `ValidationFailed` if the timeout is out of range
pub fn timeout(
    raw: Option<u64>,
    config: &StoreConfig,
    ctx: &ErrorContext,
) -> Result<u64, ProfileError> {
    let Some(timeout_ms) = raw else {
        return Ok(config.default_timeout_ms);
    };
    if !config.timeout_in_range(timeout_ms) {
        return Err(ProfileError::validation(
            format!(
                "Timeout must be between {} and {} ms",
                config.min_timeout_ms, config.max_timeout_ms
            ),
            ctx.clone(),
        ));
    }
    Ok(timeout_ms)
}

/// Trim an optional text field; empty becomes `None`
#[must_use]
pub fn optional_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Trim, drop empties, and deduplicate keeping first occurrence
#[must_use]
pub fn organizations<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for org in raw {
        let org = org.as_ref().trim();
        if !org.is_empty() && !out.iter().any(|o| o == org) {
            out.push(org.to_string());
        }
    }
    out
}
