//! A library with common types and persistence for team evidence submissions.

pub mod service;
pub mod store;
pub mod validation;

#[cfg(feature = "database")]
pub mod db_util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use service::EvidenceService;
pub use store::{EvidenceStore, memory::MemoryEvidenceStore};
pub use validation::{CorrectEvidence, SubmitEvidence};

/// A single team submission and its review state, as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceRecord {
    pub id: u64,
    pub team: String,
    pub team_class: Option<String>,
    pub level: i32,
    pub points: f64,
    pub link: String,
    pub note: Option<String>,
    pub validated: bool,
    pub correction_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EvidenceRecord {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            team: self.team.clone(),
            team_class: self.team_class.clone(),
            level: self.level,
        }
    }
}

/// The slot a submission fills. At most one record exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub team: String,
    /// `None` is one key value, distinct from every named class.
    pub team_class: Option<String>,
    pub level: i32,
}

/// A submission that passed validation, ready to be upserted.
/// Review state is not carried: every upsert re-opens review.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvidence {
    pub key: NaturalKey,
    pub points: f64,
    pub link: String,
    pub note: Option<String>,
}

/// Failures surfaced by the evidence service.
#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    #[error("{0}")]
    Validation(String),
    #[error("no evidence with id {0}")]
    NotFound(String),
    #[error("persistence error: {0}")]
    Persistence(String),
}
