//! Best-effort parsing of the delivery date columns.
//!
//! The chase sheet is maintained in a Dutch locale, so every ambiguous
//! numeric form is read day-first: `03-04-2025` is 3 April.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Formats tried first, in order.
const PRIMARY_DATETIME: &str = "%Y-%m-%d %H:%M:%S";
const PRIMARY_DATES: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"];

const FALLBACK_DATETIMES: [&str; 9] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M",
];

const FALLBACK_DATES: [&str; 10] = [
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d-%m-%y",
    "%d/%m/%y",
    "%d.%m.%y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d-%b-%Y",
];

/// A parsed date, or the `NoDate` sentinel.
///
/// The variant order matters: the derived `Ord` puts `NoDate` after every
/// real date, which is how unparsable rows end up last when sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParsedDate {
    Date(NaiveDateTime),
    NoDate,
}

impl ParsedDate {
    pub fn parse(value: Option<&str>) -> ParsedDate {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return ParsedDate::NoDate;
        };

        parse_primary(value)
            .or_else(|| parse_permissive(value))
            .map(ParsedDate::Date)
            .unwrap_or(ParsedDate::NoDate)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            ParsedDate::Date(dt) => Some(dt.date()),
            ParsedDate::NoDate => None,
        }
    }

    /// Strictly before `today`. `NoDate` is never overdue.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.date().is_some_and(|d| d < today)
    }

    /// `dd-mm-yyyy`, or an empty string for `NoDate`.
    pub fn display(&self) -> String {
        match self {
            ParsedDate::Date(dt) => dt.format("%d-%m-%Y").to_string(),
            ParsedDate::NoDate => String::new(),
        }
    }
}

fn parse_primary(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, PRIMARY_DATETIME) {
        return Some(dt);
    }
    PRIMARY_DATES.iter().find_map(|fmt| parse_date(value, fmt))
}

fn parse_permissive(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }

    FALLBACK_DATETIMES
        .iter()
        .find_map(|fmt| {
            NaiveDateTime::parse_from_str(value, fmt)
                .ok()
                .filter(|dt| plausible_year(fmt, dt.year()))
        })
        .or_else(|| FALLBACK_DATES.iter().find_map(|fmt| parse_date(value, fmt)))
}

fn parse_date(value: &str, fmt: &str) -> Option<NaiveDateTime> {
    NaiveDate::parse_from_str(value, fmt)
        .ok()
        .filter(|d| plausible_year(fmt, d.year()))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// `%Y` also accepts one or two digit years; those belong to the `%y` forms.
fn plausible_year(fmt: &str, year: i32) -> bool {
    !fmt.contains("%Y") || year >= 1000
}
