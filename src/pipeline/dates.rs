//! Date Parsing
//! Ordered candidate formats with a flexible, day-first fallback.
//!
//! The source exports mix `DD.MM.YYYY`, `YYYY-MM-DD` and `YYYYMMDD`
//! encodings across countries and years, so a column is parsed with the
//! first format that accepts every entry and only falls back to per-value
//! guessing when none does.

use chrono::NaiveDate;
use serde::Serialize;

/// Month-name layouts tried before the numeric heuristics.
const NAMED_FORMATS: [&str; 5] = ["%d %B %Y", "%d. %B %Y", "%B %d, %Y", "%d %b %Y", "%b %d, %Y"];

/// How a column of dates was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DateResolution {
    /// Every non-blank entry parsed under this format.
    Format(String),
    /// No candidate matched the whole column; values were parsed one by one.
    Flexible,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDates {
    pub dates: Vec<Option<NaiveDate>>,
    pub resolution: DateResolution,
    /// Indices of non-blank entries that could not be parsed at all.
    pub unparsed: Vec<usize>,
}

impl ParsedDates {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

fn non_blank<S: AsRef<str>>(value: &Option<S>) -> Option<&str> {
    value.as_ref().and_then(|value| {
        let text: &str = value.as_ref();
        let text = text.trim();
        (!text.is_empty()).then_some(text)
    })
}

/// Parse a column of date strings.
///
/// Blank entries are missing values: they never block a candidate format
/// and never count as failures.
pub fn parse_dates_with_fallback<S, F>(values: &[Option<S>], formats: &[F]) -> ParsedDates
where
    S: AsRef<str>,
    F: AsRef<str>,
{
    let texts: Vec<Option<&str>> = values.iter().map(non_blank).collect();

    for format in formats {
        let format: &str = format.as_ref();
        let parsed: Option<Vec<Option<NaiveDate>>> = texts
            .iter()
            .map(|text| match text {
                None => Some(None),
                Some(text) => NaiveDate::parse_from_str(text, format).ok().map(Some),
            })
            .collect();
        if let Some(dates) = parsed {
            return ParsedDates {
                dates,
                resolution: DateResolution::Format(format.to_string()),
                unparsed: Vec::new(),
            };
        }
    }

    let dates: Vec<Option<NaiveDate>> = texts
        .iter()
        .map(|text| text.and_then(parse_date_flexible))
        .collect();
    let unparsed = texts
        .iter()
        .zip(&dates)
        .enumerate()
        .filter(|(_, (text, date))| text.is_some() && date.is_none())
        .map(|(row, _)| row)
        .collect();

    ParsedDates {
        dates,
        resolution: DateResolution::Flexible,
        unparsed,
    }
}

/// Parse a single date without a known format, preferring day before month.
pub fn parse_date_flexible(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(date) = NAMED_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
    {
        return Some(date);
    }

    // "2020-03-01 00:00:00" or "2020-03-01T06:00"
    let date_part = if text.contains(':') {
        text.split([' ', 'T']).next().unwrap_or(text)
    } else {
        text
    };

    let tokens: Vec<&str> = date_part.split(['.', '/', '-']).map(str::trim).collect();
    if tokens
        .iter()
        .any(|token| token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    match tokens.as_slice() {
        [compact] if compact.len() == 8 => NaiveDate::parse_from_str(compact, "%Y%m%d").ok(),
        [year, month, day] if year.len() == 4 => {
            NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
        }
        [first, second, year] => {
            let year = expand_year(year)?;
            let first: u32 = first.parse().ok()?;
            let second: u32 = second.parse().ok()?;
            NaiveDate::from_ymd_opt(year, second, first)
                .or_else(|| NaiveDate::from_ymd_opt(year, first, second))
        }
        _ => None,
    }
}

/// Two-digit years follow chrono's `%y` window: 00-68 -> 20xx, 69-99 -> 19xx.
fn expand_year(token: &str) -> Option<i32> {
    let year: i32 = token.parse().ok()?;
    match token.len() {
        4 => Some(year),
        2 if year < 69 => Some(2000 + year),
        2 => Some(1900 + year),
        _ => None,
    }
}
