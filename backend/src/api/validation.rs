//! Length checks for text fields bounded by `VARCHAR` columns.

use crate::error::ApiError;

/// `routine.title`
pub const MAX_TITLE_LEN: usize = 255;
/// `routine.type`, `alarm.status`
pub const MAX_LABEL_LEN: usize = 20;
/// `scheduled_ts`, `dismissed_ts`, `completed_ts`, `abort_ts`
pub const MAX_TIMESTAMP_LEN: usize = 32;

/// Rejects values longer than `max` characters, counted the way Postgres counts `VARCHAR(n)`.
pub fn check_length(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    if value.chars().count() > max {
        return Err(ApiError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

pub fn check_optional_length(field: &str, value: Option<&str>, max: usize) -> Result<(), ApiError> {
    match value {
        Some(v) => check_length(field, v, max),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_length_boundary() {
        assert!(check_length("status", &"a".repeat(MAX_LABEL_LEN), MAX_LABEL_LEN).is_ok());
        let err = check_length("status", &"a".repeat(MAX_LABEL_LEN + 1), MAX_LABEL_LEN).unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref msg) if msg == "status must be at most 20 characters"));
    }

    #[test]
    fn test_check_length_counts_characters() {
        // 20 two-byte characters still fit a VARCHAR(20)
        assert!(check_length("type", &"é".repeat(20), MAX_LABEL_LEN).is_ok());
    }

    #[test]
    fn test_check_optional_length() {
        assert!(check_optional_length("abort_ts", None, MAX_TIMESTAMP_LEN).is_ok());
        assert!(
            check_optional_length(
                "scheduled_ts",
                Some("2025-03-14T07:30:00.123456789+09:00"),
                MAX_TIMESTAMP_LEN
            )
            .is_err()
        );
    }
}
