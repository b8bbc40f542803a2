use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ParsingConfig;

/// Formats tried on every date candidate, in order.
pub const DEFAULT_DATE_FORMATS: [&str; 4] = ["%m/%d/%Y", "%m-%d-%Y", "%m/%d/%y", "%m-%d-%y"];

/// Oldest birth year accepted by default.
pub const EARLIEST_BIRTH_YEAR: i32 = 1900;

/// The current calendar year in local time.
pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Whether `year` falls within `earliest..=current_year`.
pub fn is_plausible_birth_year(year: i32, earliest: i32, current_year: i32) -> bool {
    (earliest..=current_year).contains(&year)
}

/// Extract a date of birth from one page's text.
///
/// Tries, in order:
/// 1. The date on the line after the "Patient Name and Address … Date of Birth" header
/// 2. A date following a `Date of Birth` / `DOB` / `D.O.B.` label
/// 3. Any `MM/DD/YYYY` date in the text
///
/// Candidates that fail to parse or have an implausible year are skipped.
pub fn extract_date_of_birth(text: &str) -> Option<NaiveDate> {
    extract_date_of_birth_in_year(text, current_year())
}

/// [`extract_date_of_birth`] with an explicit current year.
pub fn extract_date_of_birth_in_year(text: &str, current_year: i32) -> Option<NaiveDate> {
    extract_date_of_birth_with_config(text, current_year, &ParsingConfig::default())
}

/// Config-aware version of [`extract_date_of_birth`].
pub(crate) fn extract_date_of_birth_with_config(
    text: &str,
    current_year: i32,
    config: &ParsingConfig,
) -> Option<NaiveDate> {
    // Name tokens are case-sensitive; only the header words ignore case.
    static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?i:Patient\s+Name\s+and\s+Address).*?(?i:Date\s+of\s+Birth)\s*\n\s*[A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)+[ \t]+(\d{1,2}/\d{1,2}/\d{2,4})",
        )
        .unwrap()
    });

    static LABEL_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i:Date\s+of\s+Birth|\bDOB|\bD\.O\.B\.)[:\s]+(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})")
            .unwrap()
    });

    static BARE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,2}/\d{1,2}/\d{4}").unwrap());

    if let Some(date) = first_captured_date(&HEADER_RE, text, current_year, config) {
        tracing::debug!(%date, "date of birth from header block");
        return Some(date);
    }

    if let Some(date) = first_captured_date(&LABEL_RE, text, current_year, config) {
        tracing::debug!(%date, "date of birth from label");
        return Some(date);
    }

    let date = BARE_RE
        .find_iter(text)
        .find_map(|m| parse_date_candidate_with_config(m.as_str(), current_year, config));
    if let Some(date) = date {
        tracing::debug!(%date, "date of birth from bare date");
    }
    date
}

/// First capture group of `re` in `text` that parses as a plausible date.
fn first_captured_date(
    re: &Regex,
    text: &str,
    current_year: i32,
    config: &ParsingConfig,
) -> Option<NaiveDate> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| parse_date_candidate_with_config(m.as_str(), current_year, config))
}

/// Parse one candidate string against the default format list.
///
/// Returns the first format's result that parses and has a plausible year.
pub fn parse_date_candidate(candidate: &str, current_year: i32) -> Option<NaiveDate> {
    parse_date_candidate_with_config(candidate, current_year, &ParsingConfig::default())
}

/// Config-aware version of [`parse_date_candidate`].
pub(crate) fn parse_date_candidate_with_config(
    candidate: &str,
    current_year: i32,
    config: &ParsingConfig,
) -> Option<NaiveDate> {
    let candidate = candidate.trim();
    config.date_formats.iter().find_map(|format| {
        NaiveDate::parse_from_str(candidate, format)
            .ok()
            .filter(|date| {
                is_plausible_birth_year(date.year(), config.earliest_birth_year, current_year)
            })
    })
}
