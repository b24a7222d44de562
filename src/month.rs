//! Month parsing and the month-of-reference-year date range used by every
//! dashboard query.

use time::{Date, Month, util::days_in_year_month};

/// The year the dashboard reports on.
///
/// The seed feed is a fixed historical data set, so month filters always
/// resolve against this year rather than the current one.
pub const REFERENCE_YEAR: i32 = 2022;

/// How a request's `month` query parameter filters transactions.
///
/// An unrecognized month name deliberately matches nothing instead of
/// erroring, so a typo in the dashboard's month picker shows an empty chart
/// rather than a 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthFilter {
    /// No `month` parameter was given; match every transaction.
    Any,
    /// Match transactions whose sale date falls in this month of
    /// [REFERENCE_YEAR].
    In(Month),
    /// The `month` parameter was given but not recognized; match nothing.
    Unmatched,
}

impl MonthFilter {
    /// Build a filter from the raw `month` query parameter.
    pub fn parse(param: Option<&str>) -> Self {
        match param {
            None => Self::Any,
            Some(text) if text.trim().is_empty() => Self::Any,
            Some(text) => match parse_month(text) {
                Some(month) => Self::In(month),
                None => Self::Unmatched,
            },
        }
    }
}

/// Parse a month given as an English name (case-insensitive) or a number
/// from 1 to 12.
///
/// Returns `None` for anything else.
pub fn parse_month(text: &str) -> Option<Month> {
    let text = text.trim();

    if let Ok(number) = text.parse::<u8>() {
        return Month::try_from(number).ok();
    }

    let month = match text.to_lowercase().as_str() {
        "january" => Month::January,
        "february" => Month::February,
        "march" => Month::March,
        "april" => Month::April,
        "may" => Month::May,
        "june" => Month::June,
        "july" => Month::July,
        "august" => Month::August,
        "september" => Month::September,
        "october" => Month::October,
        "november" => Month::November,
        "december" => Month::December,
        _ => return None,
    };

    Some(month)
}

/// The first and last day of `month` in [REFERENCE_YEAR].
///
/// Both dates are inclusive, matching the `BETWEEN` operator used in the
/// transaction queries.
pub fn month_date_range(month: Month) -> (Date, Date) {
    let first = Date::from_calendar_date(REFERENCE_YEAR, month, 1)
        .expect("the first of the month is always a valid date");
    let last = Date::from_calendar_date(
        REFERENCE_YEAR,
        month,
        days_in_year_month(REFERENCE_YEAR, month),
    )
    .expect("the last day of the month is always a valid date");

    (first, last)
}
