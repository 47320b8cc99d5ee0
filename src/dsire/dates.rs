// src/dsire/dates.rs
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

static ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d)(st|nd|rd|th)\b").expect("ordinal regex should compile"));
static SLASHED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4}|\d{2})$").expect("slashed regex should compile")
});
static ISO_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}-\d{1,2}-\d{1,2})[T ]").expect("iso regex should compile"));

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

// %B also accepts the abbreviated month name when parsing
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y%m%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%A, %B %d, %Y",
];

/// Best-effort parse of a free-form date string into a calendar date.
///
/// Never fails: anything unrecognised is `None`.
pub fn parse_loose_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Some(d) = parse_slashed(s) {
        return Some(d);
    }

    let cleaned = ORDINAL.replace_all(s, "$1");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(&cleaned, fmt) {
            return Some(d);
        }
    }
    // "March 2021" means the first of the month
    if let Ok(d) = NaiveDate::parse_from_str(&format!("1 {}", cleaned), "%d %B %Y") {
        return Some(d);
    }

    ISO_PREFIX
        .captures(s)
        .and_then(|c| NaiveDate::parse_from_str(&c[1], "%Y-%m-%d").ok())
}

/// `M/D/YYYY`, `M/D/YY` and their dashed forms. Two-digit years pivot at 69.
fn parse_slashed(s: &str) -> Option<NaiveDate> {
    let caps = SLASHED.captures(s)?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let year_str = &caps[3];
    let mut year: i32 = year_str.parse().ok()?;
    if year_str.len() == 2 {
        year += if year < 69 { 2000 } else { 1900 };
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn parses_common_shapes() {
        assert_eq!(parse_loose_date("March 3, 2021"), ymd(2021, 3, 3));
        assert_eq!(
            parse_loose_date("March 3, 2021").map(|d| d.to_string()).as_deref(),
            Some("2021-03-03")
        );
        assert_eq!(parse_loose_date("Mar 3rd, 2021"), ymd(2021, 3, 3));
        assert_eq!(parse_loose_date("2021-03-03"), ymd(2021, 3, 3));
        assert_eq!(parse_loose_date("2021-03-03T10:20:30"), ymd(2021, 3, 3));
        assert_eq!(parse_loose_date("2021-03-03T10:20:30.123Z"), ymd(2021, 3, 3));
        assert_eq!(parse_loose_date("3/4/2021"), ymd(2021, 3, 4));
        assert_eq!(parse_loose_date("12/31/99"), ymd(1999, 12, 31));
        assert_eq!(parse_loose_date("2021/03/03"), ymd(2021, 3, 3));
        assert_eq!(parse_loose_date("3 March 2021"), ymd(2021, 3, 3));
        assert_eq!(parse_loose_date("June 2019"), ymd(2019, 6, 1));
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_loose_date("not a date"), None);
        assert_eq!(parse_loose_date(""), None);
        assert_eq!(parse_loose_date("13/45/2021"), None);
        assert_eq!(parse_loose_date("Ongoing"), None);
    }
}
