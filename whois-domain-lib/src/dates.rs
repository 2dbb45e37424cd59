//! Lenient date parsing for registry responses.
//!
//! WHOIS servers format dates in dozens of ways ("14-Jul-2011",
//! "2011.07.14 12:00:00", "before Aug-1996", ...). Parsing is best effort:
//! anything unrecognized becomes `None` and never fails the lookup.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Formats carrying an explicit UTC offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S %z",
    "%a %b %d %H:%M:%S %z %Y",
    "%d-%b-%Y %H:%M:%S %z",
];

/// Date-time formats without an offset; interpreted as UTC.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d-%b-%Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%a %b %d %H:%M:%S %Y",
    "%Y%m%d %H:%M:%S",
];

/// Date-only formats; midnight UTC.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y.%m.%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%Y%m%d",
];

/// Month-and-year partials; anchored to the first day of the month.
const MONTH_YEAR_FORMATS: &[&str] = &["%b-%Y", "%B-%Y", "%b %Y", "%B %Y", "%m/%Y", "%Y-%m"];

/// Zone suffixes some registries append after a naive timestamp.
const ZONE_SUFFIXES: &[&str] = &[
    "UTC", "GMT", "(UTC)", "(GMT)", "[UTC]", "Z", "CET", "CEST", "(JST)", "JST",
];

/// Parse a registry date string into a UTC timestamp.
///
/// Returns `None` for empty or unrecognized input.
///
/// # Examples
///
/// ```rust
/// use whois_domain_lib::normalize_date;
///
/// assert!(normalize_date("14-Jul-2011").is_some());
/// assert!(normalize_date("sometime last year").is_none());
/// ```
pub fn normalize_date(input: &str) -> Option<DateTime<Utc>> {
    let mut value = input.trim();
    if value.is_empty() {
        return None;
    }

    // Nominet: "before Aug-1996"
    if let Some(prefix) = value.get(..7) {
        if prefix.eq_ignore_ascii_case("before ") {
            value = value[7..].trim();
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive = strip_zone_suffix(value);
    parse_naive(naive)
}

fn parse_naive(value: &str) -> Option<DateTime<Utc>> {
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return midnight(date);
        }
    }
    for format in MONTH_YEAR_FORMATS {
        let anchored = format!("1 {}", value);
        if let Ok(date) = NaiveDate::parse_from_str(&anchored, &format!("%d {}", format)) {
            return midnight(date);
        }
    }
    None
}

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt))
}

fn strip_zone_suffix(value: &str) -> &str {
    for suffix in ZONE_SUFFIXES {
        if let Some(stripped) = value.strip_suffix(suffix) {
            return stripped.trim_end();
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn ymd(dt: DateTime<Utc>) -> (i32, u32, u32) {
        (dt.year(), dt.month(), dt.day())
    }

    #[test]
    fn test_rfc3339() {
        let dt = normalize_date("1995-08-14T04:00:00Z").unwrap();
        assert_eq!(ymd(dt), (1995, 8, 14));
        assert_eq!(dt.hour(), 4);

        let dt = normalize_date("2011-07-14T12:00:00+02:00").unwrap();
        assert_eq!(dt.hour(), 10);
    }

    #[test]
    fn test_fractional_seconds() {
        let dt = normalize_date("2024-03-01T10:20:30.123Z").unwrap();
        assert_eq!(ymd(dt), (2024, 3, 1));
    }

    #[test]
    fn test_day_month_name_year() {
        let dt = normalize_date("14-Jul-2011").unwrap();
        assert_eq!(ymd(dt), (2011, 7, 14));
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_before_partial_date_anchors_to_month_start() {
        let dt = normalize_date("before Aug-1996").unwrap();
        assert_eq!(ymd(dt), (1996, 8, 1));
    }

    #[test]
    fn test_naive_with_zone_suffix() {
        let dt = normalize_date("2020-01-15 10:20:30 UTC").unwrap();
        assert_eq!(ymd(dt), (2020, 1, 15));
        assert_eq!(dt.minute(), 20);

        let dt = normalize_date("2020-01-15 10:20:30 (JST)").unwrap();
        assert_eq!(ymd(dt), (2020, 1, 15));
    }

    #[test]
    fn test_european_formats() {
        assert_eq!(ymd(normalize_date("15.01.2020").unwrap()), (2020, 1, 15));
        assert_eq!(
            ymd(normalize_date("2020.01.15 08:00:00").unwrap()),
            (2020, 1, 15)
        );
        assert_eq!(ymd(normalize_date("15/01/2020").unwrap()), (2020, 1, 15));
    }

    #[test]
    fn test_compact_and_long_forms() {
        assert_eq!(ymd(normalize_date("20200115").unwrap()), (2020, 1, 15));
        assert_eq!(
            ymd(normalize_date("15 January 2020").unwrap()),
            (2020, 1, 15)
        );
    }

    #[test]
    fn test_garbage_yields_none() {
        assert!(normalize_date("").is_none());
        assert!(normalize_date("   ").is_none());
        assert!(normalize_date("not a date").is_none());
        assert!(normalize_date("before").is_none());
        assert!(normalize_date("2020-13-45").is_none());
    }
}
