//! Profile export/import tests

use std::sync::Arc;

use profstore_core::profile::{CreateProfileRequest, EnvironmentVariable, REDACTED_CREDENTIAL};
use profstore_core::storage::MemoryBackend;
use profstore_core::{ProfileErrorKind, ProfileStore};
use serde_json::{json, Value};

fn create_store() -> ProfileStore {
    ProfileStore::new(Arc::new(MemoryBackend::new()))
}

fn full_request() -> CreateProfileRequest {
    let mut request = CreateProfileRequest::new("Work", "https://work.example.com");
    request.description = Some("Day job".to_string());
    request.system_prompt = Some("Answer in English".to_string());
    request.connection.credential = Some("secret-token".to_string());
    request.connection.timeout_ms = Some(90_000);
    request.fixed_organizations = vec!["acme".to_string()];
    request.environment_variables = vec![
        EnvironmentVariable::new("REGION", "eu"),
        EnvironmentVariable::new("REGION", "us"),
    ];
    request.is_default = true;
    request
}

#[test]
fn test_export_redacts_credential() {
    let store = create_store();
    let profile = store.create(full_request()).unwrap();

    let exported = store.export(profile.id.as_str()).unwrap();
    assert!(!exported.contains("secret-token"));

    let doc: Value = serde_json::from_str(&exported).unwrap();
    assert_eq!(doc["exportVersion"], json!(1));
    assert_eq!(doc["connection"]["credential"], json!(REDACTED_CREDENTIAL));
    assert_eq!(doc["name"], json!("Work"));
    assert!(doc.get("exportedAt").is_some());
}

#[test]
fn test_export_unknown_profile_is_not_found() {
    let store = create_store();
    let err = store.export("ghost").unwrap_err();
    assert_eq!(err.profile_kind(), Some(ProfileErrorKind::NotFound));
}

#[test]
fn test_import_round_trip_creates_new_profile() {
    let store = create_store();
    let original = store.create(full_request()).unwrap();
    let exported = store.export(original.id.as_str()).unwrap();

    let imported = store.import(&exported).unwrap();

    assert_ne!(imported.id, original.id);
    assert_eq!(imported.name, original.name);
    assert_eq!(imported.description, original.description);
    assert_eq!(imported.system_prompt, original.system_prompt);
    assert_eq!(imported.fixed_organizations, original.fixed_organizations);
    assert_eq!(imported.environment_variables, original.environment_variables);
    assert_eq!(imported.connection.endpoint, original.connection.endpoint);
    assert_eq!(imported.connection.timeout_ms, 90_000);
    // The secret never leaves the store
    assert_eq!(imported.connection.credential, None);
    assert!(!imported.is_default);
    assert!(imported.repository_history.is_empty());

    assert_eq!(store.list().unwrap().len(), 2);
    assert_eq!(store.resolve_active_profile_id(None).unwrap(), original.id);
}

#[test]
fn test_import_rejects_malformed_documents() {
    let store = create_store();
    for doc in [
        "not json".to_string(),
        json!([1, 2]).to_string(),
        json!({"connection": {"endpoint": "https://x"}}).to_string(),
        json!({"name": "n", "exportVersion": 2, "connection": {"endpoint": "https://x"}}).to_string(),
    ] {
        let err = store.import(&doc).unwrap_err();
        assert_eq!(err.profile_kind(), Some(ProfileErrorKind::ValidationFailed));
    }
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_import_with_invalid_endpoint_fails_validation() {
    let store = create_store();
    let doc = json!({"name": "n", "connection": {"endpoint": "  "}});
    let err = store.import(&doc.to_string()).unwrap_err();
    assert_eq!(err.profile_kind(), Some(ProfileErrorKind::ValidationFailed));
}

#[test]
fn test_import_legacy_document_maps_repositories() {
    let store = create_store();
    let doc = json!({
        "name": "Legacy",
        "connection": {"endpoint": "https://legacy", "apiKey": "plain-key"},
        "fixedRepository": "globex/site"
    });

    let imported = store.import(&doc.to_string()).unwrap();
    assert_eq!(imported.fixed_organizations, vec!["globex".to_string()]);
    assert_eq!(imported.connection.credential.as_deref(), Some("plain-key"));
}

#[test]
fn test_preview_does_not_write() {
    let store = create_store();
    let original = store.create(full_request()).unwrap();
    let exported = store.export(original.id.as_str()).unwrap();

    let preview = store.preview_import(&exported).unwrap();
    assert_eq!(preview.name, "Work");
    assert_eq!(preview.environment_variable_count, 2);
    assert_eq!(preview.organization_count, 1);
    assert!(!preview.has_credential);
    assert_eq!(store.list().unwrap().len(), 1);
}
