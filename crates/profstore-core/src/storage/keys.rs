//! Storage key layout

/// Prefix of every primary profile record
pub const PROFILE_PREFIX: &str = "profile:";

/// Derived profile index
pub const INDEX_KEY: &str = "profiles:index";

/// Pointer to the default profile id
pub const DEFAULT_POINTER_KEY: &str = "profiles:default";

/// Flat settings written by releases that predate profiles. Read only.
pub mod legacy {
    pub const ENDPOINT: &str = "settings.endpoint";
    pub const API_KEY: &str = "settings.apiKey";
    pub const TIMEOUT: &str = "settings.timeout";
    pub const SYSTEM_PROMPT: &str = "settings.systemPrompt";
    pub const ENVIRONMENT_VARIABLES: &str = "settings.environmentVariables";
    pub const FIXED_REPOSITORY: &str = "settings.fixedRepository";
}

#[must_use]
pub fn profile_key(id: &str) -> String {
    format!("{PROFILE_PREFIX}{id}")
}

/// Extract the profile id from a primary record key
#[must_use]
pub fn profile_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(PROFILE_PREFIX).filter(|id| !id.is_empty())
}
