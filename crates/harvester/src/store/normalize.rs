//! Normalization applied to a dataset right before it is written.

use std::cmp::Reverse;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::record::{
    DESCRIPTION_FIELD, FieldValue, MIRROR_FIELD, RepositoryRecord, TIMESTAMP_FIELDS,
};

/// Output format of normalized timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static MIRROR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bmirror\b").expect("mirror pattern is valid"));

/// Whether a description marks its repository as a mirror.
#[must_use]
pub fn describes_mirror(description: &str) -> bool {
    MIRROR_PATTERN.is_match(description)
}

/// Flag every record whose description mentions the word "mirror".
///
/// Records without a match keep whatever `isMirror` value they already had.
pub fn mark_mirrors(records: &mut [RepositoryRecord]) {
    for record in records.iter_mut() {
        if record
            .get(DESCRIPTION_FIELD)
            .and_then(FieldValue::as_str)
            .is_some_and(describes_mirror)
        {
            record.set(MIRROR_FIELD, true);
        }
    }
}

/// Parse a timestamp cell and strip its timezone, keeping the wall-clock time.
///
/// Unparseable values become null.
#[must_use]
pub fn normalize_timestamp(value: &FieldValue) -> FieldValue {
    let Some(raw) = value.as_str().map(str::trim) else {
        return FieldValue::Null;
    };
    parse_naive(raw)
        .map(|ts| FieldValue::Text(ts.format(TIMESTAMP_FORMAT).to_string()))
        .unwrap_or(FieldValue::Null)
}

fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }
    for format in [TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Normalize the `createdAt`/`pushedAt` cells of every record.
pub fn normalize_timestamps(records: &mut [RepositoryRecord]) {
    for record in records.iter_mut() {
        for field in TIMESTAMP_FIELDS {
            if let Some(value) = record.get(field) {
                let normalized = normalize_timestamp(value);
                record.set(field, normalized);
            }
        }
    }
}

/// Sort by descending star count; records without stars go last.
///
/// Ties are broken by identity so the output is stable across runs.
pub fn sort_by_stars_desc(records: &mut [RepositoryRecord]) {
    records.sort_by_cached_key(|r| (Reverse(r.stargazers()), r.identity()));
}

/// Apply mirror detection, timestamp normalization and star ordering.
#[must_use]
pub fn finalize(mut records: Vec<RepositoryRecord>) -> Vec<RepositoryRecord> {
    mark_mirrors(&mut records);
    normalize_timestamps(&mut records);
    sort_by_stars_desc(&mut records);
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_detection_is_case_insensitive_and_word_bounded() {
        assert!(describes_mirror("Read-only MIRROR of the upstream project"));
        assert!(describes_mirror("mirror"));
        assert!(!describes_mirror("mirrored files"));
        assert!(!describes_mirror("A mirrormaker tool"));
    }

    #[test]
    fn mark_mirrors_keeps_existing_flags() {
        let mut records = vec![
            RepositoryRecord::from_cells([
                ("description", FieldValue::from("GitLab mirror")),
                ("isMirror", FieldValue::Bool(false)),
            ]),
            RepositoryRecord::from_cells([
                ("description", FieldValue::from("bots")),
                ("isMirror", FieldValue::Bool(true)),
            ]),
            RepositoryRecord::from_cells([("description", FieldValue::Null)]),
        ];
        mark_mirrors(&mut records);
        assert_eq!(records[0].get("isMirror"), Some(&FieldValue::Bool(true)));
        assert_eq!(records[1].get("isMirror"), Some(&FieldValue::Bool(true)));
        assert_eq!(records[2].get("isMirror"), None);
    }

    #[test]
    fn timestamps_lose_their_timezone() {
        let utc = normalize_timestamp(&FieldValue::from("2021-03-04T05:06:07Z"));
        assert_eq!(utc, FieldValue::from("2021-03-04 05:06:07"));

        let offset = normalize_timestamp(&FieldValue::from("2021-03-04T05:06:07+02:00"));
        assert_eq!(offset, FieldValue::from("2021-03-04 05:06:07"));

        let naive = normalize_timestamp(&FieldValue::from("2021-03-04 05:06:07"));
        assert_eq!(naive, FieldValue::from("2021-03-04 05:06:07"));

        let date = normalize_timestamp(&FieldValue::from("2021-03-04"));
        assert_eq!(date, FieldValue::from("2021-03-04 00:00:00"));
    }

    #[test]
    fn unparseable_timestamps_become_null() {
        assert_eq!(
            normalize_timestamp(&FieldValue::from("yesterday")),
            FieldValue::Null
        );
        assert_eq!(normalize_timestamp(&FieldValue::Int(5)), FieldValue::Null);
    }

    #[test]
    fn sort_puts_most_starred_first_and_unknown_last() {
        let mut records = vec![
            RepositoryRecord::from_cells([("owner", "a"), ("name", "low"), ("stargazers", "10")]),
            RepositoryRecord::from_cells([("owner", "a"), ("name", "none")]),
            RepositoryRecord::from_cells([("owner", "a"), ("name", "high"), ("stargazers", "900")]),
        ];
        sort_by_stars_desc(&mut records);
        let order: Vec<String> = records.iter().map(|r| r.cell("name")).collect();
        assert_eq!(order, vec!["high", "low", "none"]);
    }
}
