//! Profile configuration store
//!
//! Named connection profiles kept in a flat key-value medium, with
//! versioned records migrated on read, a derived listing index, and a
//! single default profile.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod error;
pub mod events;
pub mod profile;
pub mod storage;
pub mod store;

pub use config::StoreConfig;
pub use error::{ErrorContext, ProfileError, ProfileErrorKind, StorageError, StoreError, StoreResult};
pub use events::{ChangeEvent, ChangeKind, ChangeNotifier};
pub use profile::{
    ConnectionSettings, ConnectionUpdate, CreateProfileRequest, EnvironmentVariable, Profile,
    ProfileId, ProfileIndexEntry, ProfileUpdate,
};
pub use storage::{AesGcmCipher, KeyValueBackend, MemoryBackend, SqliteBackend};
pub use store::ProfileStore;
