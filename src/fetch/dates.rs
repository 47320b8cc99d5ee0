// src/fetch/dates.rs
use anyhow::{Context, Result};
use chrono::{Datelike, Months, NaiveDate};

pub const DATE_FMT: &str = "%Y%m%d";

pub fn yyyymmdd(d: NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

pub fn parse_yyyymmdd(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT).with_context(|| format!("expected YYYYMMDD, got {:?}", s))
}

/// Inclusive `(month_start, month_end)` windows covering the months of
/// `start..=end`. The last window ends at `end`; the first starts on the
/// first of `start`'s month.
pub fn month_chunks(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut out = Vec::new();
    let Some(mut cur) = start.with_day(1) else {
        return out;
    };
    let Some(stop) = end.with_day(1) else {
        return out;
    };
    while cur <= stop {
        let Some(next) = cur.checked_add_months(Months::new(1)) else {
            break;
        };
        let last = next.pred_opt().unwrap_or(cur);
        out.push((cur, last.min(end)));
        cur = next;
    }
    out
}
