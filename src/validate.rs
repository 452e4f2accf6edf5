//! Input validation for query operations.
//!
//! Every check returns [`QueryError::Validation`] with a human readable
//! message; the query service turns it into a `success = false` envelope.

use std::{fmt, sync::LazyLock};

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{QueryError, validation_error};

/// Upper bound for `get_sample_data`
pub const SAMPLE_LIMIT_MAX: i64 = 1000;
/// Upper bound for filtered queries
pub const FILTER_LIMIT_MAX: i64 = 10_000;

static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// Date given either as `YYYY-MM-DD` text or as a calendar date
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateInput {
    Text(String),
    Date(NaiveDate)
}

impl From<&str> for DateInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DateInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for DateInput {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl fmt::Display for DateInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d"))
        }
    }
}

impl DateInput {
    /// Resolve to a calendar date
    pub fn to_date(&self) -> Result<NaiveDate, QueryError> {
        match self {
            Self::Date(date) => Ok(*date),
            Self::Text(text) => parse_date(text)
        }
    }
}

/// Parse a strict `YYYY-MM-DD` date
pub fn parse_date(text: &str) -> Result<NaiveDate, QueryError> {
    if !DATE_SHAPE.is_match(text) {
        return Err(validation_error(format!(
            "Invalid date format: '{}' does not match YYYY-MM-DD",
            text
        )));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| {
        validation_error(format!(
            "Invalid date format: '{}' is not a calendar date ({})",
            text, e
        ))
    })
}

/// Check `1 <= limit <= max`
pub fn validate_limit(limit: i64, max: i64) -> Result<(), QueryError> {
    if limit <= 0 || limit > max {
        return Err(validation_error(format!(
            "Limit must be between 1 and {}",
            group_thousands(max)
        )));
    }
    Ok(())
}

/// Check latitude and longitude ranges: inside bounds and `min <= max`
pub fn validate_coordinates(lat_range: (f64, f64), lon_range: (f64, f64)) -> Result<(), QueryError> {
    let (min_lat, max_lat) = lat_range;
    if !(-90.0 <= min_lat && min_lat <= max_lat && max_lat <= 90.0) {
        return Err(validation_error(format!(
            "Invalid latitude range: ({}, {}). Must be between -90 and 90",
            min_lat, max_lat
        )));
    }
    let (min_lon, max_lon) = lon_range;
    if !(-180.0 <= min_lon && min_lon <= max_lon && max_lon <= 180.0) {
        return Err(validation_error(format!(
            "Invalid longitude range: ({}, {}). Must be between -180 and 180",
            min_lon, max_lon
        )));
    }
    Ok(())
}

/// Resolve both dates and check `start <= end`
pub fn validate_dates(
    start: &DateInput,
    end: &DateInput
) -> Result<(NaiveDate, NaiveDate), QueryError> {
    let start_date = start.to_date()?;
    let end_date = end.to_date()?;
    if start_date > end_date {
        return Err(validation_error(format!(
            "Start date {} must be before end date {}",
            start_date.format("%Y-%m-%d"),
            end_date.format("%Y-%m-%d")
        )));
    }
    Ok((start_date, end_date))
}

/// Format an integer with `,` thousands separators
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_bounds() {
        assert!(validate_limit(1, SAMPLE_LIMIT_MAX).is_ok());
        assert!(validate_limit(1000, SAMPLE_LIMIT_MAX).is_ok());
        assert!(validate_limit(0, SAMPLE_LIMIT_MAX).is_err());
        assert!(validate_limit(-5, SAMPLE_LIMIT_MAX).is_err());
        assert!(validate_limit(1001, SAMPLE_LIMIT_MAX).is_err());
        assert!(validate_limit(10_000, FILTER_LIMIT_MAX).is_ok());
        assert!(validate_limit(10_001, FILTER_LIMIT_MAX).is_err());
    }

    #[test]
    fn test_limit_messages() {
        let err = validate_limit(0, SAMPLE_LIMIT_MAX).unwrap_err();
        assert_eq!(err.to_string(), "Limit must be between 1 and 1,000");
        let err = validate_limit(0, FILTER_LIMIT_MAX).unwrap_err();
        assert_eq!(err.to_string(), "Limit must be between 1 and 10,000");
    }

    #[test]
    fn test_coordinates_in_bounds() {
        assert!(validate_coordinates((-10.0, 10.0), (60.0, 80.0)).is_ok());
        assert!(validate_coordinates((-90.0, 90.0), (-180.0, 180.0)).is_ok());
        assert!(validate_coordinates((5.0, 5.0), (63.0, 63.0)).is_ok());
    }

    #[test]
    fn test_coordinates_out_of_bounds_or_inverted() {
        let err = validate_coordinates((-100.0, 100.0), (60.0, 80.0)).unwrap_err();
        assert!(err.to_string().contains("Invalid latitude range"));
        let err = validate_coordinates((-10.0, 10.0), (-200.0, 200.0)).unwrap_err();
        assert!(err.to_string().contains("Invalid longitude range"));
        assert!(validate_coordinates((10.0, -10.0), (60.0, 80.0)).is_err());
        assert!(validate_coordinates((-10.0, 10.0), (80.0, 60.0)).is_err());
    }

    #[test]
    fn test_coordinates_reject_nan() {
        assert!(validate_coordinates((f64::NAN, 10.0), (60.0, 80.0)).is_err());
        assert!(validate_coordinates((-10.0, 10.0), (60.0, f64::NAN)).is_err());
    }

    #[test]
    fn test_dates_text_and_native() {
        let (start, end) =
            validate_dates(&"2019-01-29".into(), &"2019-01-30".into()).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2019, 1, 29).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2019, 1, 30).unwrap());

        let day = NaiveDate::from_ymd_opt(2019, 1, 29).unwrap();
        let (start, end) = validate_dates(&day.into(), &day.into()).unwrap();
        assert_eq!(start, end);
    }

    #[test]
    fn test_dates_bad_format() {
        let err = validate_dates(&"2019/01/29".into(), &"2019-01-30".into()).unwrap_err();
        assert!(err.to_string().starts_with("Invalid date format"));
        assert!(err.to_string().contains("YYYY-MM-DD"));
        let err = validate_dates(&"2019-02-30".into(), &"2019-03-01".into()).unwrap_err();
        assert!(err.to_string().starts_with("Invalid date format"));
    }

    #[test]
    fn test_dates_inverted() {
        let err = validate_dates(&"2019-01-30".into(), &"2019-01-29".into()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Start date 2019-01-30 must be before end date 2019-01-29"
        );
    }

    #[test]
    fn test_date_input_display() {
        let day = NaiveDate::from_ymd_opt(2019, 1, 5).unwrap();
        assert_eq!(DateInput::from(day).to_string(), "2019-01-05");
        assert_eq!(DateInput::from("2019-01-05").to_string(), "2019-01-05");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
        assert_eq!(group_thousands(-10_000), "-10,000");
    }
}
