use chrono::NaiveDateTime;

use crate::error::MergeError;

fn strip_final_utc(timestamp: &str) -> &str {
    timestamp.strip_suffix(" (UTC)").unwrap_or(timestamp)
}

/// Parses the free-text timestamps banner templates carry ("12 September
/// 2009", "2004-05-28", "12:52, 7 December 2005 (UTC)") into a comparable
/// calendar value. The original text is kept for output; the parsed value is
/// only ever a sort key.
pub fn parse_timestamp(kind: &'static str, value: &str) -> Result<NaiveDateTime, MergeError> {
    let trimmed = strip_final_utc(value.trim()).trim();
    if trimmed.is_empty() {
        return Err(MergeError::UnparseableDate {
            kind,
            value: value.to_string(),
        });
    }
    dtparse::parse(trimmed)
        .map(|(datetime, _offset)| datetime)
        .map_err(|_| MergeError::UnparseableDate {
            kind,
            value: value.to_string(),
        })
}
