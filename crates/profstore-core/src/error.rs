//! Error types for the profile store
//!
//! Two families are kept apart: [`StorageError`] describes the medium
//! failing, [`ProfileError`] describes a domain operation failing. They meet
//! only in [`StoreError`], which never converts one into the other.

use std::fmt;
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures of the persistent key-value medium
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Storage is full, or the write was estimated over the soft limit
    #[error("Storage quota exceeded for '{key}': {message}")]
    QuotaExceeded { key: String, message: String },

    /// Storage is disabled or not permitted
    #[error("Storage access denied for '{key}': {message}")]
    AccessDenied { key: String, message: String },

    /// Any other failure of the underlying medium
    #[error("Storage operation '{operation}' failed for '{key}': {message}")]
    OperationFailed {
        operation: &'static str,
        key: String,
        message: String,
    },

    /// Raw bytes could not be parsed
    #[error("Unreadable data at '{key}': {message}")]
    InvalidData { key: String, message: String },
}

impl StorageError {
    /// Get the error code for CLI/API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::AccessDenied { .. } => "ACCESS_DENIED",
            Self::OperationFailed { .. } => "STORAGE_FAILED",
            Self::InvalidData { .. } => "STORAGE_INVALID_DATA",
        }
    }

    /// Key the failure relates to
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::QuotaExceeded { key, .. }
            | Self::AccessDenied { key, .. }
            | Self::OperationFailed { key, .. }
            | Self::InvalidData { key, .. } => key,
        }
    }

    /// Whether retrying without user action can succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OperationFailed { .. })
    }

    /// Message suitable for showing to a user
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::QuotaExceeded { .. } => {
                "Storage is full. Free up space by deleting unused profiles and try again."
                    .to_string()
            }
            Self::AccessDenied { .. } => {
                "Storage is unavailable. Allow persistent storage or disable private mode and try again."
                    .to_string()
            }
            Self::OperationFailed { .. } | Self::InvalidData { .. } => {
                GENERIC_FAILURE.to_string()
            }
        }
    }
}

const GENERIC_FAILURE: &str = "The operation failed. Please try again.";

/// Machine-readable kind of a domain failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileErrorKind {
    ValidationFailed,
    NotFound,
    InvalidData,
    MigrationFailed,
    CreationFailed,
    UpdateFailed,
    DeleteFailed,
}

impl ProfileErrorKind {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::NotFound => "PROFILE_NOT_FOUND",
            Self::InvalidData => "PROFILE_INVALID_DATA",
            Self::MigrationFailed => "MIGRATION_FAILED",
            Self::CreationFailed => "CREATION_FAILED",
            Self::UpdateFailed => "UPDATE_FAILED",
            Self::DeleteFailed => "DELETE_FAILED",
        }
    }
}

impl fmt::Display for ProfileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Where a domain failure happened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Store method that failed
    pub method: &'static str,
    /// Profile the operation targeted
    pub profile_id: Option<String>,
    /// Storage key involved
    pub key: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub fn new(method: &'static str) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_profile(mut self, id: impl Into<String>) -> Self {
        self.profile_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Failure of a domain operation on a profile
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ProfileError {
    pub kind: ProfileErrorKind,
    pub message: String,
    pub context: ErrorContext,
}

impl ProfileError {
    #[must_use]
    pub fn new(kind: ProfileErrorKind, message: impl Into<String>, context: ErrorContext) -> Self {
        Self {
            kind,
            message: message.into(),
            context,
        }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::new(ProfileErrorKind::ValidationFailed, message, context)
    }

    #[must_use]
    pub fn not_found(id: &str, method: &'static str) -> Self {
        Self::new(
            ProfileErrorKind::NotFound,
            format!("Profile not found: {id}"),
            ErrorContext::new(method).with_profile(id),
        )
    }

    #[must_use]
    pub fn invalid_data(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::new(ProfileErrorKind::InvalidData, message, context)
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Message suitable for showing to a user
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.kind {
            ProfileErrorKind::ValidationFailed | ProfileErrorKind::NotFound => {
                self.message.clone()
            }
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

/// Any failure returned across the store boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

impl StoreError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Storage(e) => e.code(),
            Self::Profile(e) => e.code(),
        }
    }

    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Storage(e) => e.user_message(),
            Self::Profile(e) => e.user_message(),
        }
    }

    /// Domain kind, if this is a profile failure
    #[must_use]
    pub fn profile_kind(&self) -> Option<ProfileErrorKind> {
        match self {
            Self::Profile(e) => Some(e.kind),
            Self::Storage(_) => None,
        }
    }

    #[must_use]
    pub fn as_storage(&self) -> Option<&StorageError> {
        match self {
            Self::Storage(e) => Some(e),
            Self::Profile(_) => None,
        }
    }
}
