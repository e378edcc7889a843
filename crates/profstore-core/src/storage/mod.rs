//! Storage layer (key-value medium, adapter, credential cipher)

pub mod adapter;
pub mod backend;
pub mod cipher;
pub mod db;
pub mod keys;
pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use adapter::KvAdapter;
pub use backend::{BackendError, KeyValueBackend};
pub use cipher::{AesGcmCipher, CipherError, CredentialCipher, PlaintextCipher};
pub use db::{Database, DatabaseError};
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
