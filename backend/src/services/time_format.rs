use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::ApiError;

/// Parses a time of day sent as `HH:MM` (seconds are tolerated).
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, ApiError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| ApiError::Validation(format!("Invalid time format '{}'. Use HH:MM", value)))
}

pub fn parse_optional_time_of_day(value: Option<&str>) -> Result<Option<NaiveTime>, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => parse_time_of_day(v).map(Some),
        _ => Ok(None),
    }
}

pub fn format_time_of_day(time: &NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Calendar date of an execution timestamp.
///
/// Timestamps are stored as client-supplied text, so several layouts are
/// accepted. Offsets are not normalised: the date is the one written in the
/// timestamp.
pub fn timestamp_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local().date());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }
    value
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_of_day() {
        let t = parse_time_of_day("07:30").unwrap();
        assert_eq!(format_time_of_day(&t), "07:30");

        let t = parse_time_of_day("23:05:59").unwrap();
        assert_eq!(format_time_of_day(&t), "23:05");
    }

    #[test]
    fn test_parse_time_of_day_rejects_garbage() {
        assert!(matches!(
            parse_time_of_day("7 o'clock"),
            Err(ApiError::Validation(_))
        ));
        assert!(parse_time_of_day("25:00").is_err());
        assert!(parse_time_of_day("").is_err());
    }

    #[test]
    fn test_optional_time_of_day_treats_blank_as_none() {
        assert_eq!(parse_optional_time_of_day(None).unwrap(), None);
        assert_eq!(parse_optional_time_of_day(Some("  ")).unwrap(), None);
        assert!(parse_optional_time_of_day(Some("06:00")).unwrap().is_some());
        assert!(parse_optional_time_of_day(Some("six")).is_err());
    }

    #[test]
    fn test_timestamp_date_accepts_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();

        assert_eq!(timestamp_date("2025-03-14T07:30:00+09:00"), Some(expected));
        assert_eq!(timestamp_date("2025-03-14T07:30:00Z"), Some(expected));
        assert_eq!(timestamp_date("2025-03-14T07:30:00"), Some(expected));
        assert_eq!(timestamp_date("2025-03-14 07:30:00.123"), Some(expected));
        assert_eq!(timestamp_date("2025-03-14 07:30"), Some(expected));
        assert_eq!(timestamp_date("2025-03-14"), Some(expected));
    }

    #[test]
    fn test_timestamp_date_rejects_unreadable_values() {
        assert_eq!(timestamp_date("yesterday"), None);
        assert_eq!(timestamp_date(""), None);
        assert_eq!(timestamp_date("2025-13-40T00:00:00"), None);
    }
}
