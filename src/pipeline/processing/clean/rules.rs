//! Field-level repair rules applied by the cleaner.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::UNKNOWN_AGE_SENTINEL;
use crate::domain::Value;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

static WHITESPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Keep only digits; ten-digit numbers become `(AAA) BBB-CCCC`.
pub fn normalize_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        format!("({}) {}-{}", &digits[0..3], &digits[3..6], &digits[6..10])
    } else {
        digits
    }
}

/// Parse a numeric cell, truncating decimals toward zero.
pub fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        Value::Text(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}

/// Any non-numeric age, including the `"unknown"` sentinel, maps to `-1`.
pub fn coerce_age(value: &Value) -> i64 {
    parse_integer(value).unwrap_or(UNKNOWN_AGE_SENTINEL)
}

/// Blank addresses become `placeholder`; runs of whitespace collapse to one space.
pub fn normalize_address(address: Option<&str>, placeholder: &str) -> String {
    match address {
        Some(a) if !a.trim().is_empty() => WHITESPACE_RUN_RE.replace_all(a, " ").trim().to_string(),
        _ => placeholder.to_string(),
    }
}

/// Normalize a signup date to `YYYY-MM-DD`. `/` separators are read as `-`;
/// ISO dates win, then day-first, then month-first.
pub fn normalize_signup_date(raw: &str) -> Option<String> {
    parse_signup_date(raw).map(|d| d.format("%Y-%m-%d").to_string())
}

pub fn parse_signup_date(raw: &str) -> Option<NaiveDate> {
    let dashed = raw.trim().replace('/', "-");
    if dashed.is_empty() {
        return None;
    }

    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%m-%d-%Y"];
    const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&dashed, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(&dashed, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Trim and capitalize (`"ACTIVE"` -> `"Active"`); empty becomes `placeholder`.
pub fn normalize_status(status: Option<&str>, placeholder: &str) -> String {
    let trimmed = status.map(str::trim).unwrap_or_default();
    let mut chars = trimmed.chars();
    match chars.next() {
        None => placeholder.to_string(),
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));
        assert!(!is_valid_email("bad-email"));
        assert!(!is_valid_email("a@x.c"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_phone_normalization() {
        assert_eq!(normalize_phone("555-123-4567"), "(555) 123-4567");
        assert_eq!(normalize_phone("(555) 123-4567"), "(555) 123-4567");
        assert_eq!(normalize_phone("5551234567"), "(555) 123-4567");
        assert_eq!(normalize_phone("123"), "123");
        assert_eq!(normalize_phone("+1 555 123 4567"), "15551234567");
        assert_eq!(normalize_phone("n/a"), "");
    }

    #[test]
    fn test_age_coercion() {
        assert_eq!(coerce_age(&Value::text("unknown")), -1);
        assert_eq!(coerce_age(&Value::Null), -1);
        assert_eq!(coerce_age(&Value::text(" 42 ")), 42);
        assert_eq!(coerce_age(&Value::text("42.9")), 42);
        assert_eq!(coerce_age(&Value::Int(130)), 130);
        assert_eq!(coerce_age(&Value::Float(f64::NAN)), -1);
    }

    #[test]
    fn test_address_normalization() {
        assert_eq!(normalize_address(Some("   "), "Unknown"), "Unknown");
        assert_eq!(normalize_address(Some(""), "Unknown"), "Unknown");
        assert_eq!(normalize_address(None, "Unknown"), "Unknown");
        assert_eq!(
            normalize_address(Some("  12 Main St \n Springfield\tIL  "), "Unknown"),
            "12 Main St Springfield IL"
        );
    }

    #[test]
    fn test_signup_date_formats() {
        assert_eq!(normalize_signup_date("2022-03-15").as_deref(), Some("2022-03-15"));
        assert_eq!(normalize_signup_date("15/03/2022").as_deref(), Some("2022-03-15"));
        assert_eq!(normalize_signup_date("1/2/2021").as_deref(), Some("2021-02-01"));
        assert_eq!(normalize_signup_date("3/15/2022").as_deref(), Some("2022-03-15"));
        assert_eq!(normalize_signup_date("2022-03-15 08:30:00").as_deref(), Some("2022-03-15"));
        assert_eq!(normalize_signup_date("31/2/2021"), None);
        assert_eq!(normalize_signup_date("not a date"), None);
        assert_eq!(normalize_signup_date(""), None);
    }

    #[test]
    fn test_status_normalization() {
        assert_eq!(normalize_status(Some("  INACTIVE "), "Unknown"), "Inactive");
        assert_eq!(normalize_status(Some("pending"), "Unknown"), "Pending");
        assert_eq!(normalize_status(Some("active"), "Unknown"), "Active");
        assert_eq!(normalize_status(Some(""), "Unknown"), "Unknown");
        assert_eq!(normalize_status(Some("   "), "Unknown"), "Unknown");
        assert_eq!(normalize_status(None, "Unknown"), "Unknown");
    }
}
