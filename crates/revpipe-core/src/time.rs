//! Date/time parsing and formatting helpers
//!
//! All patterns are chrono strftime strings. Parsers return `None` instead
//! of erroring so validators can turn failures into structured errors.

use chrono::{NaiveDate, NaiveDateTime};

/// Kernel default date pattern.
pub const DEFAULT_DATE_PATTERN: &str = "%d.%m.%Y";
/// Kernel default datetime pattern.
pub const DEFAULT_DATETIME_PATTERN: &str = "%d.%m.%Y %H:%M:%S";

/// Reservation document date pattern.
pub const DATE_PATTERN: &str = "%Y-%m-%d";
/// Reservation document datetime pattern (microsecond fraction).
pub const DATETIME_PATTERN: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Timestamp format for log lines and the scheduler banner.
pub const LOG_PATTERN: &str = "%d.%m.%Y %H:%M:%S";
/// Suffix stamped onto archived success files.
pub const SUCCESS_STAMP_PATTERN: &str = "%Y%m%d%H%S%M";

pub fn parse_date(value: &str, pattern: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), pattern).ok()
}

pub fn parse_datetime(value: &str, pattern: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), pattern).ok()
}

pub fn format_date(value: NaiveDate, pattern: &str) -> String {
    value.format(pattern).to_string()
}

pub fn format_datetime(value: NaiveDateTime, pattern: &str) -> String {
    value.format(pattern).to_string()
}

/// Current local wall-clock time, truncated to a naive timestamp.
pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Unix-timestamp suffix used for tmp/error archive names:
/// `<secs>_<micros>` (the dot of a fractional timestamp becomes `_`).
pub fn unix_stamp(value: NaiveDateTime) -> String {
    let secs = value.and_utc().timestamp();
    let micros = value.and_utc().timestamp_subsec_micros();
    format!("{secs}_{micros:06}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_patterns() {
        assert_eq!(
            parse_date("2025-05-10", DATE_PATTERN),
            NaiveDate::from_ymd_opt(2025, 5, 10)
        );
        assert_eq!(
            parse_date("10.05.2025", DEFAULT_DATE_PATTERN),
            NaiveDate::from_ymd_opt(2025, 5, 10)
        );
        assert_eq!(parse_date("2025-13-40", DATE_PATTERN), None);
        assert_eq!(parse_date("2025-05-10 12:00:00", DATE_PATTERN), None);
    }

    #[test]
    fn test_parse_datetime_with_fraction() {
        let parsed = parse_datetime("2025-05-10 12:30:00.123456", DATETIME_PATTERN).unwrap();
        assert_eq!(format_datetime(parsed, "%Y-%m-%d %H:%M:%S%.6f"), "2025-05-10 12:30:00.123456");
        assert!(parse_datetime("2025-05-10", DATETIME_PATTERN).is_none());
    }

    #[test]
    fn test_unix_stamp_has_underscore() {
        let ts = parse_datetime("2025-05-10 12:30:00.000042", DATETIME_PATTERN).unwrap();
        let stamp = unix_stamp(ts);
        assert!(stamp.ends_with("_000042"));
        assert!(!stamp.contains('.'));
    }
}
