//! Lenient date parsing for hand-maintained CSVs.
//!
//! Price histories and event catalogs mix formats ("20-May-87",
//! "Apr 22, 2020", "09/03/2020", "2020-03-09"). Ambiguous slash and dot forms
//! are read day-first.

use chrono::{NaiveDate, NaiveDateTime};

// Two-digit-year forms come first: "%Y" would happily read "87" as year 87.
const DATE_FORMATS: [&str; 10] = [
    "%d-%b-%y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%d/%m/%y",
    "%d/%m/%Y",
    "%Y-%m-%d",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y/%m/%d",
    "%d %b %Y",
];

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a date in any of the accepted formats.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_mixed_formats() {
        assert_eq!(parse_date("20-May-87"), Some(d(1987, 5, 20)));
        assert_eq!(parse_date("20-May-1987"), Some(d(1987, 5, 20)));
        assert_eq!(parse_date("Apr 22, 2020"), Some(d(2020, 4, 22)));
        assert_eq!(parse_date("2020-03-09"), Some(d(2020, 3, 9)));
        assert_eq!(parse_date("2020/03/09"), Some(d(2020, 3, 9)));
        assert_eq!(parse_date("2020-03-09 00:00:00"), Some(d(2020, 3, 9)));
    }

    #[test]
    fn slash_forms_are_day_first() {
        assert_eq!(parse_date("09/03/2020"), Some(d(2020, 3, 9)));
        assert_eq!(parse_date("09/03/20"), Some(d(2020, 3, 9)));
        assert_eq!(parse_date("09.03.2020"), Some(d(2020, 3, 9)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("31/02/2020"), None);
    }
}
