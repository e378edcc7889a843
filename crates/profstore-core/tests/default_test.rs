//! Default profile resolution tests

use std::sync::Arc;

use profstore_core::profile::{CreateProfileRequest, ProfileUpdate};
use profstore_core::storage::keys::{legacy, profile_key, DEFAULT_POINTER_KEY};
use profstore_core::storage::{BackendError, KeyValueBackend, MemoryBackend};
use profstore_core::{ProfileErrorKind, ProfileStore};
use serde_json::json;

fn create_store() -> (Arc<MemoryBackend>, ProfileStore) {
    let backend = Arc::new(MemoryBackend::new());
    let store = ProfileStore::new(backend.clone());
    (backend, store)
}

fn flagged_count(store: &ProfileStore) -> usize {
    store.list().unwrap().iter().filter(|e| e.is_default).count()
}

/// Write a record straight to the medium, bypassing the store
fn seed_record(backend: &MemoryBackend, id: &str, name: &str, is_default: bool) {
    let record = json!({
        "id": id,
        "name": name,
        "connection": {"endpoint": "https://seed", "timeoutMs": 30000, "enabled": true},
        "isDefault": is_default,
        "createdAt": "2024-01-01T00:00:00.000Z",
        "updatedAt": "2024-01-01T00:00:00.000Z"
    });
    backend
        .set_item(&profile_key(id), &record.to_string())
        .unwrap();
}

#[test]
fn test_created_default_is_resolved() {
    let (_, store) = create_store();
    let mut request = CreateProfileRequest::new("Work", "https://x");
    request.is_default = true;
    let work = store.create(request).unwrap();

    assert!(work.is_default);
    assert_eq!(store.resolve_active_profile_id(None).unwrap(), work.id);
    assert_eq!(store.default_pointer().unwrap().as_deref(), Some(work.id.as_str()));
}

#[test]
fn test_deleting_only_profile_bootstraps_default() {
    let (_, store) = create_store();
    let mut request = CreateProfileRequest::new("Work", "https://x");
    request.is_default = true;
    let work = store.create(request).unwrap();

    assert!(store.delete(work.id.as_str()).unwrap());
    assert_eq!(store.default_pointer().unwrap(), None);

    let active = store.resolve_active_profile_id(None).unwrap();
    assert_ne!(active, work.id);
    let profile = store.get(active.as_str()).unwrap().unwrap();
    assert_eq!(profile.name, "Default");
    assert_eq!(profile.connection.endpoint, "http://localhost:8080");
    assert!(profile.is_default);
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn test_deleting_default_hands_default_to_next() {
    let (_, store) = create_store();
    let a = store.create(CreateProfileRequest::new("A", "https://a")).unwrap();
    let b = store.create(CreateProfileRequest::new("B", "https://b")).unwrap();
    store.set_default(a.id.as_str()).unwrap();

    store.delete(a.id.as_str()).unwrap();

    assert_eq!(store.default_pointer().unwrap().as_deref(), Some(b.id.as_str()));
    assert!(store.get(b.id.as_str()).unwrap().unwrap().is_default);
    assert_eq!(store.resolve_active_profile_id(None).unwrap(), b.id);
}

#[test]
fn test_set_default_leaves_exactly_one_flag() {
    let (backend, store) = create_store();
    seed_record(&backend, "one", "One", true);
    seed_record(&backend, "two", "Two", true);
    seed_record(&backend, "three", "Three", false);
    store.rebuild_index().unwrap();
    assert_eq!(flagged_count(&store), 2);

    store.set_default("three").unwrap();

    assert_eq!(flagged_count(&store), 1);
    let entries = store.list().unwrap();
    assert_eq!(entries[0].id.as_str(), "three");
    assert!(entries[0].is_default);
    assert_eq!(store.default_pointer().unwrap().as_deref(), Some("three"));
}

#[test]
fn test_set_default_with_no_flags() {
    let (backend, store) = create_store();
    seed_record(&backend, "one", "One", false);
    seed_record(&backend, "two", "Two", false);

    store.set_default("two").unwrap();
    assert_eq!(flagged_count(&store), 1);
    assert_eq!(store.resolve_active_profile_id(None).unwrap().as_str(), "two");
}

#[test]
fn test_set_default_unknown_profile_is_not_found() {
    let (_, store) = create_store();
    let err = store.set_default("ghost").unwrap_err();
    assert_eq!(err.profile_kind(), Some(ProfileErrorKind::NotFound));
    assert_eq!(store.default_pointer().unwrap(), None);
}

#[test]
fn test_url_override_wins_when_it_exists() {
    let (_, store) = create_store();
    let mut request = CreateProfileRequest::new("Work", "https://x");
    request.is_default = true;
    let work = store.create(request).unwrap();
    let home = store.create(CreateProfileRequest::new("Home", "https://h")).unwrap();

    assert_eq!(store.resolve_active_profile_id(Some(home.id.as_str())).unwrap(), home.id);
    assert_eq!(store.resolve_active_profile_id(Some("ghost")).unwrap(), work.id);
    assert_eq!(store.resolve_active_profile_id(Some("  ")).unwrap(), work.id);
}

#[test]
fn test_stale_pointer_falls_back_to_flag() {
    let (backend, store) = create_store();
    seed_record(&backend, "one", "One", false);
    seed_record(&backend, "two", "Two", true);
    backend.set_item(DEFAULT_POINTER_KEY, "deleted-long-ago").unwrap();

    assert_eq!(store.resolve_active_profile_id(None).unwrap().as_str(), "two");
}

#[test]
fn test_pointer_wins_over_flag() {
    let (backend, store) = create_store();
    seed_record(&backend, "one", "One", false);
    seed_record(&backend, "two", "Two", true);
    backend.set_item(DEFAULT_POINTER_KEY, "one").unwrap();

    assert_eq!(store.resolve_active_profile_id(None).unwrap().as_str(), "one");
}

#[test]
fn test_unflagged_profiles_resolve_to_first_index_entry() {
    let (_, store) = create_store();
    let only = store.create(CreateProfileRequest::new("Only", "https://o")).unwrap();
    assert_eq!(store.resolve_active_profile_id(None).unwrap(), only.id);
}

#[test]
fn test_bootstrap_from_legacy_settings() {
    let (backend, store) = create_store();
    backend.set_item(legacy::ENDPOINT, "https://legacy.example.com").unwrap();
    backend.set_item(legacy::API_KEY, "legacy-key").unwrap();
    backend.set_item(legacy::TIMEOUT, "45000").unwrap();
    backend.set_item(legacy::SYSTEM_PROMPT, "Be terse").unwrap();
    backend
        .set_item(legacy::ENVIRONMENT_VARIABLES, r#"{"REGION":"eu"}"#)
        .unwrap();
    backend.set_item(legacy::FIXED_REPOSITORY, "acme/api").unwrap();

    let profile = store.active_profile(None).unwrap();

    assert_eq!(profile.name, "Default");
    assert!(profile.is_default);
    assert_eq!(profile.connection.endpoint, "https://legacy.example.com");
    assert_eq!(profile.connection.credential.as_deref(), Some("legacy-key"));
    assert_eq!(profile.connection.timeout_ms, 45_000);
    assert_eq!(profile.system_prompt.as_deref(), Some("Be terse"));
    assert_eq!(profile.fixed_organizations, vec!["acme".to_string()]);
    assert_eq!(profile.environment_variables.len(), 1);
    assert_eq!(profile.environment_variables[0].key, "REGION");
}

#[test]
fn test_bootstrap_is_guarded_when_profiles_exist() {
    let (_, store) = create_store();
    let existing = store.create(CreateProfileRequest::new("Existing", "https://e")).unwrap();

    let profile = store.bootstrap_from_legacy_settings().unwrap();
    assert_eq!(profile.id, existing.id);
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn test_unsetting_default_through_update() {
    let (_, store) = create_store();
    let mut request = CreateProfileRequest::new("Work", "https://x");
    request.is_default = true;
    let work = store.create(request).unwrap();

    let updated = store
        .update(
            work.id.as_str(),
            ProfileUpdate {
                is_default: Some(false),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();

    assert!(!updated.is_default);
    assert_eq!(store.default_pointer().unwrap(), None);
    assert_eq!(flagged_count(&store), 0);
    // Still resolvable as the first entry
    assert_eq!(store.resolve_active_profile_id(None).unwrap(), work.id);
}

#[test]
fn test_setting_default_through_update() {
    let (_, store) = create_store();
    let a = store.create(CreateProfileRequest::new("A", "https://a")).unwrap();
    let b = store.create(CreateProfileRequest::new("B", "https://b")).unwrap();
    store.set_default(a.id.as_str()).unwrap();

    store
        .update(
            b.id.as_str(),
            ProfileUpdate {
                is_default: Some(true),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();

    assert_eq!(flagged_count(&store), 1);
    assert!(!store.get(a.id.as_str()).unwrap().unwrap().is_default);
    assert_eq!(store.resolve_active_profile_id(None).unwrap(), b.id);
}

/// Medium that refuses writes to the default pointer only
struct PointerLocked(MemoryBackend);

impl KeyValueBackend for PointerLocked {
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendError> {
        self.0.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), BackendError> {
        if key == DEFAULT_POINTER_KEY {
            return Err(BackendError::AccessDenied(key.to_string()));
        }
        self.0.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), BackendError> {
        self.0.remove_item(key)
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        self.0.keys()
    }
}

#[test]
fn test_create_survives_failed_default_switch() {
    let backend = Arc::new(PointerLocked(MemoryBackend::new()));
    let store = ProfileStore::new(backend.clone());
    let mut request = CreateProfileRequest::new("Work", "https://x");
    request.is_default = true;

    let created = store.create(request).unwrap();

    assert!(!created.is_default);
    assert!(backend.get_item(DEFAULT_POINTER_KEY).unwrap().is_none());
    assert_eq!(store.get(created.id.as_str()).unwrap().unwrap().name, "Work");
    assert_eq!(store.list().unwrap().len(), 1);
}
