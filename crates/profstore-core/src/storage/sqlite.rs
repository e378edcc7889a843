//! `SQLite`-backed storage medium

use chrono::Utc;
use rusqlite::{params, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::backend::{BackendError, KeyValueBackend};
use super::db::{Database, DatabaseError};

/// Key-value items persisted in a `SQLite` database file
pub struct SqliteBackend {
    db: Mutex<Database>,
}

impl SqliteBackend {
    /// Open or create the database at `path`
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_database(Database::open(path)?))
    }

    /// In-memory database (for testing)
    ///
    /// # Errors
    /// Returns an error if the database cannot be created
    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_database(Database::in_memory()?))
    }

    #[must_use]
    pub fn from_database(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn lock(&self) -> MutexGuard<'_, Database> {
        // Handle mutex poisoning by recovering the lock
        self.db
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn translate(err: &rusqlite::Error) -> BackendError {
    match err.sqlite_error_code() {
        Some(ErrorCode::DiskFull | ErrorCode::TooBig) => BackendError::QuotaExceeded(err.to_string()),
        Some(
            ErrorCode::ReadOnly
            | ErrorCode::PermissionDenied
            | ErrorCode::AuthorizationForStatementDenied
            | ErrorCode::CannotOpen,
        ) => BackendError::AccessDenied(err.to_string()),
        _ => BackendError::Other(err.to_string()),
    }
}

impl KeyValueBackend for SqliteBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendError> {
        let db = self.lock();
        db.connection()
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| translate(&e))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let db = self.lock();
        db.connection()
            .execute(
                r"
                INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                ",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .map(|_| ())
            .map_err(|e| translate(&e))
    }

    fn remove_item(&self, key: &str) -> Result<(), BackendError> {
        let db = self.lock();
        db.connection()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map(|_| ())
            .map_err(|e| translate(&e))
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        let db = self.lock();
        let mut stmt = db
            .connection()
            .prepare("SELECT key FROM kv ORDER BY key")
            .map_err(|e| translate(&e))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| translate(&e))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row.map_err(|e| translate(&e))?);
        }
        Ok(keys)
    }
}
