//! An in-process store for tests and local development.

use super::*;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    records: Vec<EvidenceRecord>,
}

/// Keeps records in a vector behind a single lock.
/// Find-or-create runs under that lock, so a natural key never gets two records.
#[derive(Default)]
pub struct MemoryEvidenceStore {
    state: Mutex<MemoryState>,
}

impl MemoryEvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, String> {
        self.state
            .lock()
            .map_err(|_| "memory store lock poisoned".to_string())
    }

    fn update_by_id(
        &self,
        id: u64,
        apply: impl FnOnce(&mut EvidenceRecord),
    ) -> Result<Option<EvidenceRecord>, String> {
        let mut state = self.lock()?;
        let Some(record) = state.records.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        apply(record);
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }
}

impl EvidenceStore for MemoryEvidenceStore {
    fn list_newest_first(&self) -> Result<Vec<EvidenceRecord>, String> {
        let state = self.lock()?;
        let mut records = state.records.clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    fn upsert_by_key(&self, new: NewEvidence) -> Result<EvidenceRecord, String> {
        let mut state = self.lock()?;
        let now = Utc::now();

        if let Some(record) = state
            .records
            .iter_mut()
            .find(|r| r.natural_key() == new.key)
        {
            record.points = new.points;
            record.link = new.link;
            record.note = new.note;
            record.validated = false;
            record.correction_note = None;
            record.updated_at = now;
            return Ok(record.clone());
        }

        state.next_id += 1;
        let record = EvidenceRecord {
            id: state.next_id,
            team: new.key.team,
            team_class: new.key.team_class,
            level: new.key.level,
            points: new.points,
            link: new.link,
            note: new.note,
            validated: false,
            correction_note: None,
            created_at: now,
            updated_at: now,
        };
        state.records.push(record.clone());
        Ok(record)
    }

    fn mark_validated(&self, id: u64) -> Result<Option<EvidenceRecord>, String> {
        self.update_by_id(id, |record| {
            record.validated = true;
            record.correction_note = None;
        })
    }

    fn mark_for_correction(
        &self,
        id: u64,
        correction_note: Option<String>,
    ) -> Result<Option<EvidenceRecord>, String> {
        self.update_by_id(id, |record| {
            record.validated = false;
            record.correction_note = correction_note;
        })
    }
}
