//! Profile records: types, codec, migrations, and the derived index

pub mod codec;
pub mod export;
pub mod history;
pub mod index;
pub mod migrate;
pub mod records;
pub mod timestamp;
mod types;
pub mod validate;

pub use codec::RawRecord;
pub use export::{ImportPlan, ImportPreview, ProfileExport, REDACTED_CREDENTIAL};
pub use index::{IndexMaintainer, RebuildReport};
pub use migrate::{migrate_record_if_needed, LegacySettings, Migrated};
pub use types::*;
