//! Request bodies and the presence checks applied before any write.
//!
//! Required fields are checked for "truthiness": an empty string, a zero
//! level or zero points count as missing. Submissions worth zero points are
//! therefore rejected.

use super::*;
use serde::Deserializer;

/// Body of a submission. Every field is optional so absence can be reported.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitEvidence {
    pub team: Option<String>,
    pub team_class: Option<String>,
    pub level: Option<i32>,
    pub points: Option<f64>,
    pub link: Option<String>,
    pub note: Option<String>,
}

/// Body of a correction request.
///
/// The outer `Option` is `None` only when the key is absent. An explicit
/// `null` arrives as `Some(None)` and an empty string as `Some(Some(""))`,
/// both of which are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectEvidence {
    #[serde(default, deserialize_with = "present")]
    pub correction_note: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Collapse absent, `null` and `""` into a single `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl SubmitEvidence {
    /// Check required fields and normalize the optional ones.
    /// The error names every missing field, in request order.
    pub fn into_new_evidence(self) -> Result<NewEvidence, String> {
        let team = self.team.filter(|team| !team.is_empty());
        let level = self.level.filter(|level| *level != 0);
        let points = self.points.filter(|points| *points != 0.0 && !points.is_nan());
        let link = self.link.filter(|link| !link.is_empty());

        match (team, level, points, link) {
            (Some(team), Some(level), Some(points), Some(link)) => Ok(NewEvidence {
                key: NaturalKey {
                    team,
                    team_class: normalize_optional(self.team_class),
                    level,
                },
                points,
                link,
                note: normalize_optional(self.note),
            }),
            (team, level, points, link) => {
                let missing: Vec<&str> = [
                    ("team", team.is_none()),
                    ("level", level.is_none()),
                    ("points", points.is_none()),
                    ("link", link.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, is_missing)| is_missing.then_some(name))
                .collect();
                Err(format!("missing required fields: {}", missing.join(", ")))
            }
        }
    }
}
