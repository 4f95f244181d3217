//! Timestamp normalization for designated temporal columns.
//!
//! Designated columns are rewritten to `f64` seconds since the Unix epoch before interning, so
//! they always come out of the interner as plain numeric columns.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::warn;

use crate::types::{RawColumn, RawValue};

/// Headings normalized by default: record creation time and observation time.
pub const DEFAULT_TIMESTAMP_HEADINGS: [&str; 2] = ["created", "datetime"];

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Invalid-cell counts per normalized heading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimestampReport {
    /// `(heading, invalid_cells)` for every heading that was normalized.
    pub normalized: Vec<(String, usize)>,
}

impl TimestampReport {
    /// Total cells that could not be read as a date.
    pub fn invalid_cells(&self) -> usize {
        self.normalized.iter().map(|(_, n)| n).sum()
    }
}

/// Parse a textual date/time into seconds since the epoch.
///
/// Accepts RFC 3339 (`1970-01-01T00:00:10Z`, offsets), RFC 2822, naive
/// `YYYY-MM-DD[T ]HH:MM:SS[.fff]` and bare `YYYY-MM-DD`. Naive values are read as UTC.
/// Precision is milliseconds.
pub fn parse_date_to_epoch_seconds(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let millis = if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        dt.timestamp_millis()
    } else if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        dt.timestamp_millis()
    } else if let Some(dt) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        dt.and_utc().timestamp_millis()
    } else {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?
            .and_utc()
            .timestamp_millis()
    };

    Some(millis as f64 / 1000.0)
}

/// Normalize one cell. Numbers are taken as epoch milliseconds.
fn normalize_cell(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Number(ms) => Some(ms / 1000.0),
        RawValue::Text(s) => parse_date_to_epoch_seconds(s),
        RawValue::Missing => None,
    }
}

/// Rewrite every designated heading present in `headings` to epoch seconds.
///
/// Cells that cannot be read as a date become `NaN`; they are counted, not fatal. When a
/// designated name appears under several headings, each of them is normalized.
pub fn normalize_timestamps<S: AsRef<str>>(
    headings: &[String],
    columns: &mut [RawColumn],
    designated: &[S],
) -> TimestampReport {
    let mut report = TimestampReport::default();

    for (heading, column) in headings.iter().zip(columns.iter_mut()) {
        if !designated.iter().any(|d| d.as_ref() == heading) {
            continue;
        }

        let mut invalid = 0;
        for cell in column.iter_mut() {
            let secs = normalize_cell(cell).unwrap_or_else(|| {
                invalid += 1;
                f64::NAN
            });
            *cell = RawValue::Number(secs);
        }

        if invalid > 0 {
            warn!(heading = %heading, invalid, "timestamp cells could not be parsed; stored as NaN");
        }
        report.normalized.push((heading.clone(), invalid));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_to_seconds() {
        assert_eq!(parse_date_to_epoch_seconds("1970-01-01T00:00:10Z"), Some(10.0));
        assert_eq!(parse_date_to_epoch_seconds("1970-01-01T01:00:00+01:00"), Some(0.0));
        assert_eq!(parse_date_to_epoch_seconds("1970-01-01T00:00:01.250Z"), Some(1.25));
    }

    #[test]
    fn naive_and_date_only_forms_are_utc() {
        assert_eq!(parse_date_to_epoch_seconds("1970-01-02"), Some(86_400.0));
        assert_eq!(parse_date_to_epoch_seconds("1970-01-01 00:01:00"), Some(60.0));
        assert_eq!(parse_date_to_epoch_seconds("1970-01-01T00:00:02.5"), Some(2.5));
    }

    #[test]
    fn rfc2822() {
        assert_eq!(
            parse_date_to_epoch_seconds("Thu, 01 Jan 1970 00:00:30 +0000"),
            Some(30.0)
        );
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_date_to_epoch_seconds("yesterday"), None);
        assert_eq!(parse_date_to_epoch_seconds(""), None);
    }

    #[test]
    fn only_designated_columns_change() {
        let headings = vec!["id".to_string(), "created".to_string()];
        let mut columns = vec![
            vec![RawValue::from("1970-01-01T00:00:10Z"), RawValue::Number(2.0)],
            vec![RawValue::from("1970-01-01T00:00:10Z"), RawValue::from("not a date")],
        ];

        let report = normalize_timestamps(&headings, &mut columns, &DEFAULT_TIMESTAMP_HEADINGS);

        assert_eq!(columns[0][0], RawValue::from("1970-01-01T00:00:10Z"));
        assert_eq!(columns[1][0], RawValue::Number(10.0));
        assert!(matches!(columns[1][1], RawValue::Number(n) if n.is_nan()));
        assert_eq!(report.normalized, vec![("created".to_string(), 1)]);
        assert_eq!(report.invalid_cells(), 1);
    }

    #[test]
    fn numeric_cells_are_epoch_millis() {
        let headings = vec!["datetime".to_string()];
        let mut columns = vec![vec![RawValue::Number(1_500.0), RawValue::Missing]];
        let report = normalize_timestamps(&headings, &mut columns, &["datetime"]);
        assert_eq!(columns[0][0], RawValue::Number(1.5));
        assert!(matches!(columns[0][1], RawValue::Number(n) if n.is_nan()));
        assert_eq!(report.invalid_cells(), 1);
    }
}
