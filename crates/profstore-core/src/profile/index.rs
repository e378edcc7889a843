//! Profile index maintenance
//!
//! The index is derived data: a full scan of the primary records, projected
//! and sorted, replacing the stored index wholesale. It is never patched.

use std::cmp::Ordering;

use super::records::Records;
use super::types::{Profile, ProfileIndexEntry};
use crate::error::StorageError;
use crate::storage::keys::INDEX_KEY;
use crate::storage::KvAdapter;

/// Outcome of a rebuild
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// The index as persisted
    pub entries: Vec<ProfileIndexEntry>,
    /// Number of primary records skipped as corrupted
    pub skipped: usize,
}

pub struct IndexMaintainer<'a> {
    records: Records<'a>,
    kv: &'a KvAdapter,
}

impl<'a> IndexMaintainer<'a> {
    #[must_use]
    pub fn new(records: Records<'a>, kv: &'a KvAdapter) -> Self {
        Self { records, kv }
    }

    /// Compute the index from the primary records without persisting it
    ///
    /// # Errors
    /// Returns an error if the medium cannot be scanned
    pub fn compute(&self) -> Result<RebuildReport, StorageError> {
        let scan = self.records.scan()?;
        let mut profiles = scan.profiles;
        profiles.sort_by(index_order);

        Ok(RebuildReport {
            entries: profiles.iter().map(ProfileIndexEntry::from).collect(),
            skipped: scan.corrupted.len(),
        })
    }

    /// Recompute and persist the index
    ///
    /// # Errors
    /// Returns an error if the medium cannot be scanned or the index written
    pub fn rebuild(&self) -> Result<RebuildReport, StorageError> {
        let report = self.compute()?;
        if report.skipped > 0 {
            tracing::warn!(
                skipped = report.skipped,
                "Corrupted profile records left out of the index"
            );
        }

        self.kv.set_json(INDEX_KEY, &report.entries)?;
        tracing::debug!(entries = report.entries.len(), "Profile index rebuilt");
        Ok(report)
    }

    /// Read the persisted index, if there is a readable one
    ///
    /// # Errors
    /// Returns an error if the medium fails or the index is unparseable
    pub fn read(&self) -> Result<Option<Vec<ProfileIndexEntry>>, StorageError> {
        self.kv.get_json(INDEX_KEY)
    }

    /// Persisted index, rebuilding it when missing or unreadable
    ///
    /// # Errors
    /// Returns an error if the medium fails
    pub fn read_or_rebuild(&self) -> Result<Vec<ProfileIndexEntry>, StorageError> {
        match self.read() {
            Ok(Some(entries)) => Ok(entries),
            Ok(None) => Ok(self.rebuild()?.entries),
            Err(StorageError::InvalidData { message, .. }) => {
                tracing::warn!(error = %message, "Stored profile index unreadable, rebuilding");
                Ok(self.rebuild()?.entries)
            }
            Err(e) => Err(e),
        }
    }
}

/// Default first, then most recently used, then most recently updated
#[must_use]
pub fn index_order(a: &Profile, b: &Profile) -> Ordering {
    b.is_default
        .cmp(&a.is_default)
        .then_with(|| b.last_used().cmp(&a.last_used()))
        .then_with(|| b.updated_at.cmp(&a.updated_at))
        .then_with(|| a.id.cmp(&b.id))
}
