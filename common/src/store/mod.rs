//! The persistence seam between the service and whatever holds the records.

use super::*;

pub mod memory;

/// Storage for evidence records.
///
/// Errors are plain strings describing what went wrong in the backing store.
/// Id-keyed updates return `Ok(None)` when no record has that id.
pub trait EvidenceStore: Send + Sync {
    /// Prepare the backing store for use, e.g. create missing tables.
    fn prepare(&self) -> Result<(), String> {
        Ok(())
    }

    /// Every record, most recently created first.
    fn list_newest_first(&self) -> Result<Vec<EvidenceRecord>, String>;

    /// Create the record for this natural key, or overwrite the existing one in place.
    /// Either way the stored record ends up unvalidated with no correction note.
    fn upsert_by_key(&self, new: NewEvidence) -> Result<EvidenceRecord, String>;

    /// Set `validated` and clear the correction note.
    fn mark_validated(&self, id: u64) -> Result<Option<EvidenceRecord>, String>;

    /// Clear `validated` and store the reviewer's note.
    fn mark_for_correction(
        &self,
        id: u64,
        correction_note: Option<String>,
    ) -> Result<Option<EvidenceRecord>, String>;
}
