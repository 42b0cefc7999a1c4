//! Date shape checks.
//!
//! Capture dates are kept as the raw strings the seed carries; ordering is
//! lexicographic, which agrees with chronology for the accepted shapes.

use chrono::{DateTime, NaiveDate};

/// Whether `raw` is `YYYY`, `YYYY-MM`, `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn is_well_formed(raw: &str) -> bool {
    if DateTime::parse_from_rfc3339(raw).is_ok() {
        return true;
    }
    if NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok() {
        return raw.len() == 10;
    }
    match raw.len() {
        4 => raw.bytes().all(|b| b.is_ascii_digit()),
        7 => NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").is_ok(),
        _ => false,
    }
}

/// The lesser of two optional dates; an absent date never wins.
pub fn earliest(current: Option<String>, candidate: Option<&str>) -> Option<String> {
    match (current, candidate) {
        (Some(current), Some(candidate)) if candidate < current.as_str() => {
            Some(candidate.to_string())
        }
        (Some(current), _) => Some(current),
        (None, candidate) => candidate.map(str::to_string),
    }
}
