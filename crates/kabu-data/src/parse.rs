//! Parsing of the upstream API's string-typed fields.
//!
//! J-Quants serializes every disclosure value as a string. An empty (or
//! all-whitespace) string means the value was not reported and becomes
//! `None`; anything else must parse or the caller gets a [`DataError::Parse`].

use crate::error::{DataError, Result};
use chrono::{NaiveDate, NaiveTime};

/// Date format used by the API and the store.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Compact date format accepted on the command line.
pub const COMPACT_DATE_FORMAT: &str = "%Y%m%d";

/// Time format used by the API and the store.
pub const TIME_FORMAT: &str = "%H:%M:%S";

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Parse an optional `YYYY-MM-DD` date.
pub fn opt_date(field: &str, value: &str) -> Result<Option<NaiveDate>> {
    non_empty(value)
        .map(|v| {
            NaiveDate::parse_from_str(v, DATE_FORMAT)
                .map_err(|e| DataError::parse_field(field, value, e))
        })
        .transpose()
}

/// Parse a required `YYYY-MM-DD` date.
pub fn date(field: &str, value: &str) -> Result<NaiveDate> {
    opt_date(field, value)?.ok_or_else(|| DataError::parse_field(field, value, "missing"))
}

/// Parse an optional `HH:MM:SS` time.
pub fn opt_time(field: &str, value: &str) -> Result<Option<NaiveTime>> {
    non_empty(value)
        .map(|v| {
            NaiveTime::parse_from_str(v, TIME_FORMAT)
                .map_err(|e| DataError::parse_field(field, value, e))
        })
        .transpose()
}

/// Parse an optional integer amount (yen).
pub fn opt_i64(field: &str, value: &str) -> Result<Option<i64>> {
    non_empty(value)
        .map(|v| {
            v.parse::<i64>()
                .map_err(|e| DataError::parse_field(field, value, e))
        })
        .transpose()
}

/// Parse an optional decimal value (per-share amounts, ratios).
pub fn opt_f64(field: &str, value: &str) -> Result<Option<f64>> {
    non_empty(value)
        .map(|v| {
            v.parse::<f64>()
                .map_err(|e| DataError::parse_field(field, value, e))
        })
        .transpose()
}

/// Parse a date given on the command line, either `YYYY-MM-DD` or `YYYYMMDD`.
pub fn cli_date(value: &str) -> Result<NaiveDate> {
    let v = value.trim();
    NaiveDate::parse_from_str(v, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(v, COMPACT_DATE_FORMAT))
        .map_err(|e| DataError::parse_field("date", value, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn test_empty_is_absent(#[case] raw: &str) {
        assert_eq!(opt_date("d", raw).unwrap(), None);
        assert_eq!(opt_time("t", raw).unwrap(), None);
        assert_eq!(opt_i64("n", raw).unwrap(), None);
        assert_eq!(opt_f64("f", raw).unwrap(), None);
    }

    #[rstest]
    #[case("2024-05-10", Some(NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()))]
    #[case(" 2023-04-01 ", Some(NaiveDate::from_ymd_opt(2023, 4, 1).unwrap()))]
    fn test_opt_date(#[case] raw: &str, #[case] expected: Option<NaiveDate>) {
        assert_eq!(opt_date("d", raw).unwrap(), expected);
    }

    #[rstest]
    #[case("2024/05/10")]
    #[case("20240510")]
    #[case("not a date")]
    fn test_malformed_date_is_error(#[case] raw: &str) {
        let err = opt_date("DisclosedDate", raw).unwrap_err();
        assert!(matches!(err, DataError::Parse(_)));
        assert!(err.to_string().contains("DisclosedDate"));
    }

    #[test]
    fn test_required_date_missing() {
        assert!(date("DisclosedDate", "").is_err());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(opt_i64("n", "1234000000").unwrap(), Some(1_234_000_000));
        assert_eq!(opt_i64("n", "-5").unwrap(), Some(-5));
        assert!(opt_i64("n", "12.5").is_err());
        assert_relative_eq!(opt_f64("f", "123.45").unwrap().unwrap(), 123.45);
        assert!(opt_f64("f", "abc").is_err());
    }

    #[test]
    fn test_time() {
        assert_eq!(
            opt_time("t", "15:30:00").unwrap(),
            NaiveTime::from_hms_opt(15, 30, 0)
        );
        assert!(opt_time("t", "25:00:00").is_err());
    }

    #[rstest]
    #[case("2024-01-04")]
    #[case("20240104")]
    fn test_cli_date(#[case] raw: &str) {
        assert_eq!(
            cli_date(raw).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 4).unwrap()
        );
    }
}
