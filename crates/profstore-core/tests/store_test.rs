//! Profile CRUD tests
//!
//! Tests for create, update, delete and the storage invariants around them.

use std::sync::Arc;

use profstore_core::error::StorageError;
use profstore_core::profile::{ConnectionUpdate, CreateProfileRequest, EnvironmentVariable, ProfileUpdate};
use profstore_core::storage::keys::{profile_key, INDEX_KEY};
use profstore_core::storage::{KeyValueBackend, MemoryBackend};
use profstore_core::{ProfileErrorKind, ProfileStore, StoreError};

fn create_store() -> (Arc<MemoryBackend>, ProfileStore) {
    let backend = Arc::new(MemoryBackend::new());
    let store = ProfileStore::new(backend.clone());
    (backend, store)
}

fn work_request() -> CreateProfileRequest {
    let mut request = CreateProfileRequest::new("Work", "https://work.example.com");
    request.description = Some("Day job".to_string());
    request.connection.credential = Some("secret-token".to_string());
    request.connection.timeout_ms = Some(45_000);
    request.environment_variables = vec![EnvironmentVariable::new("REGION", "eu")];
    request.fixed_organizations = vec!["acme".to_string()];
    request
}

#[test]
fn test_create_and_get_profile() {
    let (_, store) = create_store();

    let created = store.create(work_request()).expect("Failed to create profile");
    let retrieved = store
        .get(created.id.as_str())
        .expect("Failed to get profile")
        .expect("Profile not found");

    assert_eq!(retrieved, created);
    assert_eq!(retrieved.name, "Work");
    assert_eq!(retrieved.description.as_deref(), Some("Day job"));
    assert_eq!(retrieved.connection.credential.as_deref(), Some("secret-token"));
    assert_eq!(retrieved.connection.timeout_ms, 45_000);
    assert!(retrieved.connection.enabled);
    assert_eq!(retrieved.fixed_organizations, vec!["acme".to_string()]);
    assert!(retrieved.repository_history.is_empty());
    assert_eq!(retrieved.created_at, retrieved.updated_at);
}

#[test]
fn test_create_applies_default_timeout() {
    let (_, store) = create_store();
    let created = store
        .create(CreateProfileRequest::new("Home", "http://localhost:9000"))
        .expect("Failed to create profile");
    assert_eq!(created.connection.timeout_ms, 30_000);
}

#[test]
fn test_get_nonexistent_profile() {
    let (_, store) = create_store();
    assert!(store.get("missing").expect("Failed to query").is_none());
}

#[test]
fn test_create_rejects_invalid_input_without_writing() {
    let (backend, store) = create_store();

    for request in [
        CreateProfileRequest::new("   ", "https://x"),
        CreateProfileRequest::new("Name", ""),
        {
            let mut r = CreateProfileRequest::new("Name", "https://x");
            r.connection.timeout_ms = Some(999);
            r
        },
        {
            let mut r = CreateProfileRequest::new("Name", "https://x");
            r.connection.timeout_ms = Some(300_001);
            r
        },
    ] {
        let err = store.create(request).unwrap_err();
        assert_eq!(err.profile_kind(), Some(ProfileErrorKind::ValidationFailed));
    }

    assert!(backend.is_empty());
}

#[test]
fn test_timeout_bounds_are_inclusive() {
    let (_, store) = create_store();
    for timeout in [1_000, 300_000] {
        let mut request = CreateProfileRequest::new("Edge", "https://x");
        request.connection.timeout_ms = Some(timeout);
        let created = store.create(request).expect("Failed to create profile");
        assert_eq!(created.connection.timeout_ms, timeout);
    }
}

#[test]
fn test_list_is_sorted_and_matches_records() {
    let (_, store) = create_store();
    let a = store.create(CreateProfileRequest::new("A", "https://a")).unwrap();
    let b = store.create(CreateProfileRequest::new("B", "https://b")).unwrap();
    store.set_default(b.id.as_str()).unwrap();

    let entries = store.list().expect("Failed to list profiles");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, b.id);
    assert!(entries[0].is_default);
    assert_eq!(entries[1].id, a.id);
    assert!(!entries[1].is_default);
}

#[test]
fn test_update_merges_connection_fields() {
    let (_, store) = create_store();
    let created = store.create(work_request()).unwrap();

    let updated = store
        .update(
            created.id.as_str(),
            ProfileUpdate {
                connection: Some(ConnectionUpdate {
                    timeout_ms: Some(60_000),
                    ..ConnectionUpdate::default()
                }),
                ..ProfileUpdate::default()
            },
        )
        .expect("Failed to update profile");

    assert_eq!(updated.connection.timeout_ms, 60_000);
    assert_eq!(updated.connection.endpoint, "https://work.example.com");
    assert_eq!(updated.connection.credential.as_deref(), Some("secret-token"));
    assert_eq!(updated.environment_variables.len(), 1);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);
}

#[test]
fn test_update_clears_text_and_credential_with_empty_value() {
    let (_, store) = create_store();
    let created = store.create(work_request()).unwrap();

    let updated = store
        .update(
            created.id.as_str(),
            ProfileUpdate {
                description: Some(String::new()),
                connection: Some(ConnectionUpdate {
                    credential: Some(String::new()),
                    ..ConnectionUpdate::default()
                }),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();

    assert_eq!(updated.description, None);
    assert_eq!(updated.connection.credential, None);
}

#[test]
fn test_invalid_update_leaves_record_unchanged() {
    let (backend, store) = create_store();
    let created = store.create(work_request()).unwrap();
    let before = backend.get_item(&profile_key(created.id.as_str())).unwrap();

    let err = store
        .update(
            created.id.as_str(),
            ProfileUpdate {
                description: Some("changed".to_string()),
                connection: Some(ConnectionUpdate {
                    timeout_ms: Some(5),
                    ..ConnectionUpdate::default()
                }),
                ..ProfileUpdate::default()
            },
        )
        .unwrap_err();

    assert_eq!(err.profile_kind(), Some(ProfileErrorKind::ValidationFailed));
    let after = backend.get_item(&profile_key(created.id.as_str())).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_update_unknown_profile_is_not_found() {
    let (_, store) = create_store();
    let err = store.update("nope", ProfileUpdate::default()).unwrap_err();
    assert_eq!(err.profile_kind(), Some(ProfileErrorKind::NotFound));
    assert_eq!(err.code(), "PROFILE_NOT_FOUND");
}

#[test]
fn test_delete_profile() {
    let (backend, store) = create_store();
    let created = store.create(work_request()).unwrap();

    assert!(store.delete(created.id.as_str()).expect("Failed to delete"));
    assert!(store.get(created.id.as_str()).unwrap().is_none());
    assert!(backend.get_item(&profile_key(created.id.as_str())).unwrap().is_none());
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_delete_missing_returns_false() {
    let (_, store) = create_store();
    assert!(!store.delete("missing").expect("Failed to delete"));
}

#[test]
fn test_duplicate_profile() {
    let (_, store) = create_store();
    let source = store.create(work_request()).unwrap();
    store.record_repository_usage(source.id.as_str(), "acme/api").unwrap();
    store.set_default(source.id.as_str()).unwrap();

    let copy = store.duplicate(source.id.as_str(), None).unwrap();
    assert_ne!(copy.id, source.id);
    assert_eq!(copy.name, "Work (copy)");
    assert!(!copy.is_default);
    assert!(copy.repository_history.is_empty());
    assert_eq!(copy.connection, source.connection);

    let named = store.duplicate(source.id.as_str(), Some("Staging")).unwrap();
    assert_eq!(named.name, "Staging");
    assert_eq!(store.list().unwrap().len(), 3);
}

#[test]
fn test_repository_history_is_bounded_and_unique() {
    let (_, store) = create_store();
    let created = store.create(work_request()).unwrap();
    let id = created.id.as_str();

    for i in 0..12 {
        store.record_repository_usage(id, &format!("acme/repo-{i}")).unwrap();
    }
    let profile = store.record_repository_usage(id, "acme/repo-5").unwrap();

    assert_eq!(profile.repository_history.len(), 10);
    assert_eq!(profile.repository_history[0].repository, "acme/repo-5");
    assert_eq!(
        profile
            .repository_history
            .iter()
            .filter(|h| h.repository == "acme/repo-5")
            .count(),
        1
    );
    assert_eq!(store.list().unwrap()[0].repository_count, 10);
}

#[test]
fn test_quota_exceeded_leaves_no_partial_write() {
    let backend = Arc::new(MemoryBackend::with_quota(64));
    let store = ProfileStore::new(backend.clone());

    let err = store.create(work_request()).unwrap_err();
    let storage = err.as_storage().expect("Expected a storage error");
    assert!(matches!(storage, StorageError::QuotaExceeded { .. }));
    assert!(!storage.is_retryable());
    assert!(storage.user_message().contains("Storage is full"));
    assert!(backend.is_empty());
}

#[test]
fn test_oversized_record_is_rejected_before_write() {
    let (backend, store) = create_store();
    let mut request = work_request();
    request.system_prompt = Some("x".repeat(6 * 1024 * 1024));

    let err = store.create(request).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Storage(StorageError::QuotaExceeded { .. })
    ));
    assert!(backend.is_empty());
}

#[test]
fn test_access_denied_surfaces_as_storage_error() {
    let (backend, store) = create_store();
    backend.set_access_denied(true);

    let err = store.list().unwrap_err();
    assert_eq!(err.code(), "ACCESS_DENIED");
    assert!(backend.get_item(INDEX_KEY).is_err());
}
