use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::model::RawCell;

/// Full-date layouts tried in order.  Month-first before day-first, like most
/// spreadsheet exports.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// Month-only layouts; parsed by pinning the day to the 1st.  Two-digit years
/// must be tried before `%Y`, which would read `24` as year 24.
const MONTH_FORMATS: &[&str] = &["%b %Y", "%B %Y", "%b-%y", "%b-%Y", "%Y-%m", "%m/%Y"];

/// Parse a raw cell into a calendar date.  Bare numbers are not dates.
pub fn parse_date(cell: &RawCell) -> Option<NaiveDate> {
    match cell {
        RawCell::Date(dt) => Some(dt.date()),
        RawCell::Text(s) => parse_date_str(s),
        _ => None,
    }
}

/// Parse a textual date in any of the common layouts.
pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    let pinned = format!("01 {s}");
    MONTH_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&pinned, &format!("%d {fmt}")).ok())
}

/// Format a date as the dashboard's month label, e.g. `"Jan 2024"`.
pub fn month_label(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}

/// Parse a label produced by [`month_label`] back into the first of that month.
pub fn parse_month_label(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("01 {label}"), "%d %b %Y").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(s: &str) -> Option<String> {
        parse_date_str(s).map(month_label)
    }

    #[test]
    fn parses_common_layouts() {
        assert_eq!(label("2024-01-15").as_deref(), Some("Jan 2024"));
        assert_eq!(label("2024/02/01").as_deref(), Some("Feb 2024"));
        assert_eq!(label("03/31/2024").as_deref(), Some("Mar 2024"));
        assert_eq!(label("15 Apr 2024").as_deref(), Some("Apr 2024"));
        assert_eq!(label("2024-05-01 00:00:00").as_deref(), Some("May 2024"));
        assert_eq!(label("2024-06-01T08:30:00+02:00").as_deref(), Some("Jun 2024"));
    }

    #[test]
    fn parses_month_only_layouts() {
        assert_eq!(label("Jul 2024").as_deref(), Some("Jul 2024"));
        assert_eq!(label("August 2024").as_deref(), Some("Aug 2024"));
        assert_eq!(label("Sep-24").as_deref(), Some("Sep 2024"));
        assert_eq!(label("2024-10").as_deref(), Some("Oct 2024"));
    }

    #[test]
    fn rejects_garbage_and_numbers() {
        assert_eq!(label("not a date"), None);
        assert_eq!(label(""), None);
        assert_eq!(parse_date(&RawCell::Number(45292.0)), None);
        assert_eq!(parse_date(&RawCell::Empty), None);
    }

    #[test]
    fn native_dates_pass_through() {
        let dt = NaiveDate::from_ymd_opt(2023, 12, 5)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        assert_eq!(parse_date(&RawCell::Date(dt)).map(month_label).as_deref(), Some("Dec 2023"));
    }

    #[test]
    fn month_label_round_trips_to_first_of_month() {
        assert_eq!(parse_month_label("Feb 2024"), NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(parse_month_label("garbage"), None);
    }
}
