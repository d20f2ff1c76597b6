use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};

use crate::parser::types::RawCell;

/// Accepted textual date layouts, tried in order. `true` = the layout carries a time.
/// ISO first, then day-first locale layouts, then month-first fallbacks. Each `%Y`
/// layout is followed by its two-digit-year twin.
const DATE_FORMATS: &[(&str, bool)] = &[
    ("%Y-%m-%dT%H:%M:%S%.f", true),
    ("%Y-%m-%d %H:%M:%S%.f", true),
    ("%Y-%m-%dT%H:%M", true),
    ("%Y-%m-%d %H:%M", true),
    ("%Y-%m-%d", false),
    ("%d-%m-%Y %H:%M", true),
    ("%d-%m-%y %H:%M", true),
    ("%d/%m/%Y %H:%M:%S", true),
    ("%d/%m/%y %H:%M:%S", true),
    ("%d/%m/%Y %H:%M", true),
    ("%d/%m/%y %H:%M", true),
    ("%d/%m/%Y", false),
    ("%d/%m/%y", false),
    ("%d-%m-%Y", false),
    ("%d-%m-%y", false),
    ("%d.%m.%Y", false),
    ("%d.%m.%y", false),
    ("%d-%b-%Y %I:%M:%S %p", true),
    ("%d-%b-%y %I:%M:%S %p", true),
    ("%d-%b-%Y %H:%M:%S", true),
    ("%d-%b-%y %H:%M:%S", true),
    ("%d-%b-%Y", false),
    ("%d-%b-%y", false),
    ("%d %b %Y", false),
    ("%d %b %y", false),
    ("%m/%d/%Y %I:%M:%S %p", true),
    ("%m/%d/%y %I:%M:%S %p", true),
    ("%m/%d/%Y %H:%M", true),
    ("%m/%d/%y %H:%M", true),
    ("%m/%d/%Y", false),
    ("%m/%d/%y", false),
];

/// chrono's `%Y` also accepts one to three digits; such years are left to the `%y` layouts.
const MIN_FOUR_DIGIT_YEAR: i32 = 1000;

/// Largest spreadsheet serial (9999-12-31).
const MAX_SERIAL: f64 = 2_958_465.0;

/// Identifiers above this magnitude are left in float display form.
const MAX_EXACT_INTEGER: f64 = 1e15;

/// Parse a date written as text. Returns None for blank or unparseable strings.
pub fn parse_datetime_text(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }

    for (fmt, has_time) in DATE_FORMATS {
        let parsed = if *has_time {
            NaiveDateTime::parse_from_str(trimmed, fmt).ok()
        } else {
            NaiveDate::parse_from_str(trimmed, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        };
        let short_year = fmt.contains("%Y")
            && parsed.is_some_and(|dt| dt.year() < MIN_FOUR_DIGIT_YEAR);
        if parsed.is_some() && !short_year {
            return parsed;
        }
    }

    // Serial numbers exported as text ("45292", "45292.5")
    if trimmed.chars().all(|c| c.is_ascii_digit() || c == '.') {
        if let Ok(serial) = trimmed.parse::<f64>() {
            return serial_to_datetime(serial);
        }
    }

    None
}

/// Convert a spreadsheet serial date (days since 1899-12-30, fraction = time of day).
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let days = serial.trunc() as i64;
    let seconds = (serial.fract() * 86_400.0).round() as i64;
    NaiveDate::from_ymd_opt(1899, 12, 30)?
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))
}

/// Coerce any raw cell to a timestamp. Blank cells yield None.
pub fn parse_date_cell(cell: &RawCell) -> Option<NaiveDateTime> {
    match cell {
        RawCell::Empty => None,
        RawCell::DateTime(dt) => Some(*dt),
        RawCell::Number(n) => serial_to_datetime(*n),
        RawCell::Text(s) => parse_datetime_text(s),
    }
}

/// Render a number the way a user typed it: no ".0" on integral values.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < MAX_EXACT_INTEGER {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Text form of a cell for string fields. Blank cells yield None.
pub fn cell_text(cell: &RawCell) -> Option<String> {
    match cell {
        RawCell::Empty => None,
        RawCell::Number(n) => Some(format_number(*n)),
        RawCell::DateTime(dt) => Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
        RawCell::Text(s) => Some(s.clone()),
    }
}

/// Canonical string form of a ticket identifier.
///
/// "5 732 943" → "5732943", "1001.0" → "1001", "1.001E3" → "1001";
/// anything else is returned trimmed. Leading zeros on plain digit strings are kept.
pub fn canonical_identifier(cell: &RawCell) -> Option<String> {
    let text = match cell {
        RawCell::Number(n) => return Some(format_number(*n)),
        other => cell_text(other)?,
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Thousands separators, including non-breaking spaces
    if trimmed.chars().any(char::is_whitespace)
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace())
    {
        return Some(trimmed.chars().filter(|c| c.is_ascii_digit()).collect());
    }

    if looks_like_float(trimmed) {
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() && n.fract() == 0.0 {
                return Some(format_number(n));
            }
        }
    }

    Some(trimmed.to_string())
}

/// Decimal or scientific notation, as produced by spreadsheet numeric coercion.
fn looks_like_float(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_digit())
        && s.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        && s.chars().any(|c| matches!(c, '.' | 'e' | 'E'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd_hms(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    // ── dates ───────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(
            parse_datetime_text("2024-01-05"),
            Some(ymd_hms(2024, 1, 5, 0, 0, 0))
        );
        assert_eq!(
            parse_datetime_text("2024-01-05T10:30:00"),
            Some(ymd_hms(2024, 1, 5, 10, 30, 0))
        );
        assert_eq!(
            parse_datetime_text("2024-01-05 10:30:00.250"),
            Some(
                NaiveDate::from_ymd_opt(2024, 1, 5)
                    .unwrap()
                    .and_hms_milli_opt(10, 30, 0, 250)
                    .unwrap()
            )
        );
    }

    #[test]
    fn test_parse_rfc3339_keeps_wall_clock() {
        assert_eq!(
            parse_datetime_text("2024-01-05T10:30:00+02:00"),
            Some(ymd_hms(2024, 1, 5, 10, 30, 0))
        );
    }

    #[test]
    fn test_parse_day_first_locale() {
        assert_eq!(
            parse_datetime_text("05-01-2026 16:24"),
            Some(ymd_hms(2026, 1, 5, 16, 24, 0))
        );
        assert_eq!(
            parse_datetime_text("05/01/2024"),
            Some(ymd_hms(2024, 1, 5, 0, 0, 0))
        );
        assert_eq!(
            parse_datetime_text("05.01.2024"),
            Some(ymd_hms(2024, 1, 5, 0, 0, 0))
        );
    }

    #[test]
    fn test_parse_month_name_with_meridiem() {
        assert_eq!(
            parse_datetime_text("27-Mar-24 11:02:44 AM"),
            Some(ymd_hms(2024, 3, 27, 11, 2, 44))
        );
        assert_eq!(
            parse_datetime_text("27-Mar-24 01:02:44 PM"),
            Some(ymd_hms(2024, 3, 27, 13, 2, 44))
        );
    }

    #[test]
    fn test_two_digit_years() {
        assert_eq!(
            parse_datetime_text("27-Mar-24"),
            Some(ymd_hms(2024, 3, 27, 0, 0, 0))
        );
        assert_eq!(
            parse_datetime_text("27-Mar-24 11:02:44"),
            Some(ymd_hms(2024, 3, 27, 11, 2, 44))
        );
        assert_eq!(
            parse_datetime_text("05/01/24"),
            Some(ymd_hms(2024, 1, 5, 0, 0, 0))
        );
        assert_eq!(
            parse_datetime_text("05/01/24 09:15"),
            Some(ymd_hms(2024, 1, 5, 9, 15, 0))
        );
        assert_eq!(
            parse_datetime_text("01/13/24"),
            Some(ymd_hms(2024, 1, 13, 0, 0, 0))
        );
    }

    #[test]
    fn test_four_digit_years_unchanged() {
        assert_eq!(
            parse_datetime_text("27-Mar-2024"),
            Some(ymd_hms(2024, 3, 27, 0, 0, 0))
        );
        assert_eq!(
            parse_datetime_text("05/01/2024 09:15"),
            Some(ymd_hms(2024, 1, 5, 9, 15, 0))
        );
    }

    #[test]
    fn test_month_first_fallback_when_day_first_is_impossible() {
        assert_eq!(
            parse_datetime_text("01/13/2024"),
            Some(ymd_hms(2024, 1, 13, 0, 0, 0))
        );
    }

    #[test]
    fn test_serial_dates() {
        // 45292 = 2024-01-01
        assert_eq!(serial_to_datetime(45292.0), Some(ymd_hms(2024, 1, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(45292.5), Some(ymd_hms(2024, 1, 1, 12, 0, 0)));
        assert_eq!(parse_datetime_text("45292"), Some(ymd_hms(2024, 1, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(0.0), None);
        assert_eq!(serial_to_datetime(-3.0), None);
        assert_eq!(serial_to_datetime(f64::NAN), None);
    }

    #[test]
    fn test_unparseable_and_blank() {
        assert!(parse_datetime_text("").is_none());
        assert!(parse_datetime_text("   ").is_none());
        assert!(parse_datetime_text("not-a-date").is_none());
        assert!(parse_datetime_text("2024-13-45").is_none());
    }

    #[test]
    fn test_parse_date_cell_variants() {
        let dt = ymd_hms(2024, 2, 20, 8, 0, 0);
        assert_eq!(parse_date_cell(&RawCell::DateTime(dt)), Some(dt));
        assert_eq!(
            parse_date_cell(&RawCell::Number(45292.0)),
            Some(ymd_hms(2024, 1, 1, 0, 0, 0))
        );
        assert_eq!(parse_date_cell(&RawCell::Empty), None);
    }

    // ── identifiers ─────────────────────────────────────────────────────────

    #[test]
    fn test_identifier_spaced_digits() {
        assert_eq!(
            canonical_identifier(&RawCell::Text("5 732 943".into())).as_deref(),
            Some("5732943")
        );
        assert_eq!(
            canonical_identifier(&RawCell::Text("5\u{00A0}732\u{00A0}943".into())).as_deref(),
            Some("5732943")
        );
    }

    #[test]
    fn test_identifier_numeric_artifacts() {
        assert_eq!(
            canonical_identifier(&RawCell::Number(1001.0)).as_deref(),
            Some("1001")
        );
        assert_eq!(
            canonical_identifier(&RawCell::Text("1001.0".into())).as_deref(),
            Some("1001")
        );
        assert_eq!(
            canonical_identifier(&RawCell::Text("1.2345E+4".into())).as_deref(),
            Some("12345")
        );
    }

    #[test]
    fn test_identifier_text_untouched() {
        assert_eq!(
            canonical_identifier(&RawCell::Text("  T-100 ".into())).as_deref(),
            Some("T-100")
        );
        assert_eq!(
            canonical_identifier(&RawCell::Text("007".into())).as_deref(),
            Some("007")
        );
        assert_eq!(
            canonical_identifier(&RawCell::Text("12.5".into())).as_deref(),
            Some("12.5")
        );
        assert!(canonical_identifier(&RawCell::Text("  ".into())).is_none());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-42.0), "-42");
        assert_eq!(format_number(2.75), "2.75");
    }
}
