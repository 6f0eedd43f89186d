//! Attribute format validation
//!
//! Metadata columns (file names, content types, polymorphic type names and
//! ids) are restricted to ASCII letters, digits and punctuation. File names
//! may additionally contain spaces. Control characters are never accepted.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use crate::error::ValidationErrors;

static ALPHA_NUMERIC_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[[:alnum:][:punct:]]+$").unwrap());

static ALPHA_NUMERIC_PUNCTUATION_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[[:alnum:][:punct:]][[:alnum:][:punct:] ]*$").unwrap());

/// Letters, digits and punctuation only
pub fn is_alpha_numeric_punctuation(value: &str) -> bool {
    ALPHA_NUMERIC_PUNCTUATION.is_match(value)
}

/// Letters, digits, punctuation and inner spaces
pub fn is_alpha_numeric_punctuation_or_space(value: &str) -> bool {
    ALPHA_NUMERIC_PUNCTUATION_SPACE.is_match(value)
}

/// Validate a required, charset-restricted attribute
pub fn validate_present_alpha_numeric(
    field: &str,
    value: &str,
    allow_spaces: bool,
    errors: &mut ValidationErrors,
) {
    if value.trim().is_empty() {
        errors.add(field, "can't be blank");
        return;
    }

    let ok = if allow_spaces {
        is_alpha_numeric_punctuation_or_space(value)
    } else {
        is_alpha_numeric_punctuation(value)
    };

    if !ok {
        errors.add(
            field,
            "is invalid. Only letters, numbers and punctuation are allowed",
        );
    }
}

/// Parse a user-supplied timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (taken as UTC) and bare dates.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_numeric_punctuation() {
        assert!(is_alpha_numeric_punctuation("Order"));
        assert!(is_alpha_numeric_punctuation("ImportableAttachments::Attachment"));
        assert!(is_alpha_numeric_punctuation("text/csv"));
        assert!(is_alpha_numeric_punctuation("invoice-2024_01.csv"));

        assert!(!is_alpha_numeric_punctuation(""));
        assert!(!is_alpha_numeric_punctuation("Order Item"));
        assert!(!is_alpha_numeric_punctuation("Order\n"));
        assert!(!is_alpha_numeric_punctuation("Ordér"));
        assert!(!is_alpha_numeric_punctuation("tab\there"));
    }

    #[test]
    fn test_spaces_only_where_allowed() {
        assert!(is_alpha_numeric_punctuation_or_space("my invoice.csv"));
        assert!(!is_alpha_numeric_punctuation_or_space(" leading.csv"));
        assert!(!is_alpha_numeric_punctuation_or_space("bell\u{7}.csv"));
    }

    #[test]
    fn test_validate_present_alpha_numeric() {
        let mut errors = ValidationErrors::new();
        validate_present_alpha_numeric("file_name", "", true, &mut errors);
        validate_present_alpha_numeric("content_type", "text/csv\0", false, &mut errors);
        validate_present_alpha_numeric("owner_type", "Order", false, &mut errors);

        assert_eq!(errors.get("file_name"), Some(&vec!["can't be blank".to_string()]));
        assert!(errors.has_error("content_type"));
        assert!(!errors.has_error("owner_type"));
    }

    #[test]
    fn test_parse_timestamp() {
        let expected = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(parse_timestamp("2024-01-01T00:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01 00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01"), Some(expected));
        assert_eq!(parse_timestamp("next tuesday-ish"), None);
    }
}
