//! The four evidence operations: list, submit, validate, request correction.

use super::*;
use std::sync::Arc;

/// Validates input and delegates each operation to a single store call.
#[derive(Clone)]
pub struct EvidenceService {
    store: Arc<dyn EvidenceStore>,
}

/// Ids arrive as opaque strings. One that isn't a store id can't name a record.
/// Stores keep ids in a signed 64-bit column, so larger values are unknown too.
fn parse_id(id: &str) -> Result<u64, EvidenceError> {
    id.parse::<u64>()
        .ok()
        .filter(|row_id| i64::try_from(*row_id).is_ok())
        .ok_or_else(|| EvidenceError::NotFound(id.to_string()))
}

fn persistence(operation: &str) -> impl FnOnce(String) -> EvidenceError + '_ {
    move |err| {
        log::error!("Error {operation}: {err}");
        EvidenceError::Persistence(err)
    }
}

impl EvidenceService {
    pub fn new(store: Arc<dyn EvidenceStore>) -> Self {
        Self { store }
    }

    pub fn prepare(&self) -> Result<(), EvidenceError> {
        self.store.prepare().map_err(persistence("preparing store"))
    }

    /// All records, newest first.
    pub fn list(&self) -> Result<Vec<EvidenceRecord>, EvidenceError> {
        self.store
            .list_newest_first()
            .map_err(persistence("fetching evidence"))
    }

    /// Create or overwrite the record for the submission's natural key.
    /// A resubmission always re-opens review.
    pub fn submit(&self, submission: SubmitEvidence) -> Result<EvidenceRecord, EvidenceError> {
        let new = submission
            .into_new_evidence()
            .map_err(EvidenceError::Validation)?;

        let saved = self
            .store
            .upsert_by_key(new)
            .map_err(persistence("saving evidence"))?;
        log::info!(
            "Evidence saved: id {} team {} level {}",
            saved.id,
            saved.team,
            saved.level
        );
        Ok(saved)
    }

    /// Accept a record as-is.
    pub fn validate(&self, id: &str) -> Result<EvidenceRecord, EvidenceError> {
        let row_id = parse_id(id)?;
        let updated = self
            .store
            .mark_validated(row_id)
            .map_err(persistence("validating evidence"))?
            .ok_or_else(|| EvidenceError::NotFound(id.to_string()))?;
        log::info!("Evidence validated: id {}", updated.id);
        Ok(updated)
    }

    /// Send a record back with reviewer feedback.
    /// The body must carry `correctionNote`, though it may be empty or null.
    pub fn request_correction(
        &self,
        id: &str,
        body: CorrectEvidence,
    ) -> Result<EvidenceRecord, EvidenceError> {
        let Some(correction_note) = body.correction_note else {
            return Err(EvidenceError::Validation(
                "missing correction note (correctionNote)".to_string(),
            ));
        };
        let row_id = parse_id(id)?;
        let updated = self
            .store
            .mark_for_correction(row_id, correction_note)
            .map_err(persistence("marking evidence for correction"))?
            .ok_or_else(|| EvidenceError::NotFound(id.to_string()))?;
        log::info!("Evidence marked for correction: id {}", updated.id);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A store whose backend is always unreachable.
    struct DownStore;

    impl EvidenceStore for DownStore {
        fn list_newest_first(&self) -> Result<Vec<EvidenceRecord>, String> {
            Err("connection refused".to_string())
        }
        fn upsert_by_key(&self, _new: NewEvidence) -> Result<EvidenceRecord, String> {
            Err("connection refused".to_string())
        }
        fn mark_validated(&self, _id: u64) -> Result<Option<EvidenceRecord>, String> {
            Err("connection refused".to_string())
        }
        fn mark_for_correction(
            &self,
            _id: u64,
            _correction_note: Option<String>,
        ) -> Result<Option<EvidenceRecord>, String> {
            Err("connection refused".to_string())
        }
    }

    fn memory_service() -> EvidenceService {
        EvidenceService::new(Arc::new(MemoryEvidenceStore::new()))
    }

    fn submission(team: &str, level: i32, points: f64, link: &str) -> SubmitEvidence {
        SubmitEvidence {
            team: Some(team.to_string()),
            level: Some(level),
            points: Some(points),
            link: Some(link.to_string()),
            ..Default::default()
        }
    }

    fn correction(note: Option<Option<&str>>) -> CorrectEvidence {
        CorrectEvidence {
            correction_note: note.map(|n| n.map(str::to_string)),
        }
    }

    #[test_log::test]
    fn test_first_submission_creates_open_record() {
        let service = memory_service();
        let mut input = submission("Alpha", 1, 10.0, "http://x");
        input.note = Some("see slide 3".to_string());
        service.submit(input).unwrap();

        let records = service.list().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert!(!record.validated);
        assert_eq!(record.correction_note, None);
        assert_eq!(record.points, 10.0);
        assert_eq!(record.link, "http://x");
        assert_eq!(record.note.as_deref(), Some("see slide 3"));
    }

    #[test_log::test]
    fn test_resubmission_overwrites_in_place() {
        let service = memory_service();
        let first = service.submit(submission("Alpha", 1, 10.0, "http://x")).unwrap();
        let second = service.submit(submission("Alpha", 1, 25.0, "http://y")).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.points, 25.0);
        assert_eq!(second.link, "http://y");
        assert_eq!(service.list().unwrap().len(), 1);
    }

    #[test_log::test]
    fn test_resubmission_reopens_review() {
        let service = memory_service();
        let first = service.submit(submission("Alpha", 1, 10.0, "http://x")).unwrap();
        let id = first.id.to_string();

        assert!(service.validate(&id).unwrap().validated);
        let resubmitted = service.submit(submission("Alpha", 1, 10.0, "http://x")).unwrap();
        assert!(!resubmitted.validated);

        service
            .request_correction(&id, correction(Some(Some("blurry"))))
            .unwrap();
        let resubmitted = service.submit(submission("Alpha", 1, 10.0, "http://x")).unwrap();
        assert_eq!(resubmitted.correction_note, None);
        assert!(!resubmitted.validated);
    }

    #[test_log::test]
    fn test_absent_and_empty_class_share_a_key() {
        let service = memory_service();
        let a = service.submit(submission("Alpha", 1, 10.0, "http://x")).unwrap();
        let mut with_empty = submission("Alpha", 1, 12.0, "http://x");
        with_empty.team_class = Some(String::new());
        let b = service.submit(with_empty).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.team_class, None);
    }

    #[test_log::test]
    fn test_validate_clears_correction_note() {
        let service = memory_service();
        let record = service.submit(submission("Alpha", 1, 10.0, "http://x")).unwrap();
        let id = record.id.to_string();
        service
            .request_correction(&id, correction(Some(Some("wrong link"))))
            .unwrap();

        let validated = service.validate(&id).unwrap();
        assert!(validated.validated);
        assert_eq!(validated.correction_note, None);
        assert_eq!(validated.points, 10.0);
    }

    #[test_log::test]
    fn test_validate_unknown_id_is_not_found() {
        let service = memory_service();
        let record = service.submit(submission("Alpha", 1, 10.0, "http://x")).unwrap();

        let err = service.validate("9999").unwrap_err();
        assert!(matches!(err, EvidenceError::NotFound(_)));
        let err = service.validate("not-an-id").unwrap_err();
        assert!(matches!(err, EvidenceError::NotFound(_)));
        let err = service.validate("18446744073709551615").unwrap_err();
        assert!(matches!(err, EvidenceError::NotFound(_)));

        assert_eq!(service.list().unwrap(), vec![record]);
    }

    #[test_log::test]
    fn test_correction_with_empty_note_succeeds() {
        let service = memory_service();
        let record = service.submit(submission("Alpha", 1, 10.0, "http://x")).unwrap();
        let id = record.id.to_string();
        service.validate(&id).unwrap();

        let corrected = service
            .request_correction(&id, correction(Some(Some(""))))
            .unwrap();
        assert!(!corrected.validated);
        assert_eq!(corrected.correction_note.as_deref(), Some(""));
    }

    #[test_log::test]
    fn test_correction_with_null_note_succeeds() {
        let service = memory_service();
        let record = service.submit(submission("Alpha", 1, 10.0, "http://x")).unwrap();
        let corrected = service
            .request_correction(&record.id.to_string(), correction(Some(None)))
            .unwrap();
        assert!(!corrected.validated);
        assert_eq!(corrected.correction_note, None);
    }

    #[test_log::test]
    fn test_correction_without_note_is_rejected_untouched() {
        let service = memory_service();
        let record = service.submit(submission("Alpha", 1, 10.0, "http://x")).unwrap();
        let validated = service.validate(&record.id.to_string()).unwrap();

        let err = service
            .request_correction(&record.id.to_string(), correction(None))
            .unwrap_err();
        assert!(matches!(err, EvidenceError::Validation(_)));
        assert_eq!(service.list().unwrap(), vec![validated]);
    }

    #[test_log::test]
    fn test_zero_points_is_rejected_without_write() {
        // current behavior: zero counts as missing
        let service = memory_service();
        let err = service
            .submit(submission("Alpha", 1, 0.0, "http://x"))
            .unwrap_err();
        assert!(matches!(err, EvidenceError::Validation(_)));
        assert!(service.list().unwrap().is_empty());
    }

    #[test_log::test]
    fn test_store_failures_are_persistence_errors() {
        let service = EvidenceService::new(Arc::new(DownStore));
        assert!(matches!(
            service.list().unwrap_err(),
            EvidenceError::Persistence(_)
        ));
        assert!(matches!(
            service
                .submit(submission("Alpha", 1, 10.0, "http://x"))
                .unwrap_err(),
            EvidenceError::Persistence(_)
        ));
        assert!(matches!(
            service.validate("1").unwrap_err(),
            EvidenceError::Persistence(_)
        ));
        assert!(matches!(
            service
                .request_correction("1", correction(Some(Some("redo"))))
                .unwrap_err(),
            EvidenceError::Persistence(_)
        ));
    }

    #[test_log::test]
    fn test_ids_past_i64_are_not_found_without_store_call() {
        let service = EvidenceService::new(Arc::new(DownStore));
        let too_big = (i64::MAX as u64 + 1).to_string();
        assert!(matches!(
            service.validate(&too_big).unwrap_err(),
            EvidenceError::NotFound(_)
        ));
        assert!(matches!(
            service
                .request_correction(&too_big, correction(Some(Some("redo"))))
                .unwrap_err(),
            EvidenceError::NotFound(_)
        ));
        assert!(matches!(
            service.validate(&i64::MAX.to_string()).unwrap_err(),
            EvidenceError::Persistence(_)
        ));
    }

    #[test_log::test]
    fn test_validation_runs_before_store_is_touched() {
        let service = EvidenceService::new(Arc::new(DownStore));
        assert!(matches!(
            service.submit(SubmitEvidence::default()).unwrap_err(),
            EvidenceError::Validation(_)
        ));
        assert!(matches!(
            service.request_correction("1", correction(None)).unwrap_err(),
            EvidenceError::Validation(_)
        ));
    }

    #[test_log::test]
    fn test_end_to_end_review_cycle() {
        let service = memory_service();
        let created = service.submit(submission("Alpha", 1, 10.0, "http://x")).unwrap();
        assert!(!created.validated);

        let validated = service.validate(&created.id.to_string()).unwrap();
        assert!(validated.validated);
        assert_eq!(validated.correction_note, None);

        let resubmitted = service.submit(submission("Alpha", 1, 20.0, "http://x")).unwrap();
        assert_eq!(resubmitted.id, created.id);
        assert!(!resubmitted.validated);
        assert_eq!(resubmitted.points, 20.0);
    }
}
