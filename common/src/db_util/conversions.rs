//! Safe-ish conversions between rust and sql types.

pub fn i64_to_u64(i: i64) -> Result<u64, String> {
    if i < 0 {
        Err("i64 value is negative and cannot be converted to u64".to_string())
    } else {
        Ok(i as u64)
    }
}
pub fn u64_to_i64(i: u64) -> Result<i64, String> {
    if i > i64::MAX as u64 {
        Err("u64 value exceeds i64::MAX and cannot be converted to i64".to_string())
    } else {
        Ok(i as i64)
    }
}

/// The team class column is `NOT NULL` so the unique constraint covers it.
/// An empty string stands in for "no class".
pub fn string_to_team_class(i: String) -> Option<String> {
    if i.is_empty() { None } else { Some(i) }
}
pub fn team_class_to_string(i: Option<String>) -> String {
    i.unwrap_or_default()
}
