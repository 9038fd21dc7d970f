//! Date parsing and formatting.
//!
//! Records keep their date as a [`NaiveDate`]; this module turns the various
//! strings users and spreadsheets produce (`2024-03-05`, `2024. 3. 5.`,
//! `03/05/2024`) into one, and renders it back for display.

use std::sync::LazyLock;

use chrono::{Datelike, Local, NaiveDate};
use log::warn;
use regex::Regex;

use crate::error::{DailyworkError, Result};

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));
static US_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4})$").expect("valid regex"));

/// Returns the current local date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Normalizes a free-form date string.
///
/// Unparseable input is not an error: a warning is logged and today's date is
/// substituted. Use [`parse`] where the user should be told about a typo.
pub fn normalize(input: &str) -> NaiveDate {
    normalize_or(input, today())
}

/// Like [`normalize`], with an explicit fallback instead of today's date.
pub fn normalize_or(input: &str, fallback: NaiveDate) -> NaiveDate {
    if input.trim().is_empty() {
        return fallback;
    }
    match parse(input) {
        Ok(date) => date,
        Err(_) => {
            warn!("Unrecognized date format '{}', using {}", input, fallback);
            fallback
        }
    }
}

/// Strictly parses a date in any of the supported formats.
pub fn parse(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    let invalid = || DailyworkError::InvalidDate(input.to_string());

    if ISO_DATE.is_match(trimmed) {
        return NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| invalid());
    }

    // YYYY. M. D. (Korean locale display form)
    if trimmed.contains('.') {
        let compact = trimmed.replace(' ', "");
        let parts: Vec<&str> = compact.split('.').filter(|p| !p.is_empty()).collect();
        if parts.len() >= 3 {
            if let (Ok(year), Ok(month), Ok(day)) = (
                parts[0].parse::<i32>(),
                parts[1].parse::<u32>(),
                parts[2].parse::<u32>(),
            ) {
                if year > 0 && (1..=12).contains(&month) && (1..=31).contains(&day) {
                    return NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid);
                }
            }
        }
    }

    // MM/DD/YYYY or MM-DD-YYYY
    if let Some(caps) = US_DATE.captures(trimmed) {
        let month: u32 = caps[1].parse().map_err(|_| invalid())?;
        let day: u32 = caps[2].parse().map_err(|_| invalid())?;
        let year: i32 = caps[3].parse().map_err(|_| invalid())?;
        return NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid);
    }

    Err(invalid())
}

/// Formats a date as `YYYY-MM-DD`.
pub fn to_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Formats a date as `YYYY. M. D.` (no zero padding).
pub fn to_korean(date: NaiveDate) -> String {
    format!("{}. {}. {}.", date.year(), date.month(), date.day())
}

/// Converts a spreadsheet date serial (days since 1899-12-30) to a date.
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    // Out-of-range serials saturate in the cast and are rejected by try_days.
    let days = chrono::Duration::try_days(serial.floor() as i64)?;
    epoch.checked_add_signed(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn supported_formats_agree() {
        let fallback = d(2000, 1, 1);
        for input in ["2024-03-05", "2024. 3. 5.", "2024.3.5", "2024. 03. 05", "03/05/2024", "3-5-2024", " 2024-03-05 "] {
            assert_eq!(normalize_or(input, fallback), d(2024, 3, 5), "input {input:?}");
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        let fallback = d(2000, 1, 1);
        for input in ["2024. 12. 31.", "garbage", "", "1/2/2023"] {
            let once = normalize_or(input, fallback);
            let twice = normalize_or(&to_iso(once), fallback);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn unparseable_falls_back() {
        let fallback = d(2001, 2, 3);
        assert_eq!(normalize_or("next tuesday", fallback), fallback);
        assert_eq!(normalize_or("2024-02-30", fallback), fallback);
        assert_eq!(normalize_or("2024. 13. 1.", fallback), fallback);
        assert_eq!(normalize_or("   ", fallback), fallback);
    }

    #[test]
    fn strict_parse_reports_errors() {
        assert!(matches!(parse("yesterday"), Err(DailyworkError::InvalidDate(_))));
        assert_eq!(parse("2024. 3. 5.").unwrap(), d(2024, 3, 5));
    }

    #[test]
    fn korean_display_has_no_padding() {
        assert_eq!(to_korean(d(2024, 3, 5)), "2024. 3. 5.");
        assert_eq!(to_iso(d(2024, 3, 5)), "2024-03-05");
    }

    #[test]
    fn serial_dates() {
        // 45356 is 2024-03-05 in the 1900 date system.
        assert_eq!(from_serial(45356.0), Some(d(2024, 3, 5)));
        assert_eq!(from_serial(45356.75), Some(d(2024, 3, 5)));
        assert_eq!(from_serial(f64::NAN), None);
    }

    #[test]
    fn huge_serials_are_rejected() {
        assert_eq!(from_serial(1e18), None);
        assert_eq!(from_serial(-1e18), None);
        assert_eq!(from_serial(f64::INFINITY), None);
        assert_eq!(from_serial(f64::MAX), None);
    }
}
