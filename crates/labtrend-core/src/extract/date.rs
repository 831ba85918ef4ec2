//! Report date extraction.
//!
//! Precedence:
//! 1. `Collection Date, Time` label with a `DD-Mon-YYYY` token on the next line
//! 2. Label-anchored numeric, month-name and ISO dates
//! 3. "generated/printed" and "ordered/completed" labels
//! 4. Bare numeric and ISO dates anywhere in the text
//! 5. The configured fallback date

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::DateSource;

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const MONTH_ALT: &str = "jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec";

/// Keyword label in front of a date, e.g. "Collection Date:", "Drawn on".
const LABEL: &str = r"(?:test|collection|sample|report|drawn|collected|date)(?:[ \t]+(?:date|time|on|at))?[ \t]*[:\-]?[ \t]*";

static COLLECTION_DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Collection[ \t]+Date,[ \t]*Time[ \t]*\r?\n[ \t]*(\d{1,2})-([A-Za-z]{3})-(\d{4})")
        .unwrap()
});

const NUMERIC_DATE: &str = r"\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}";
const ISO_DATE: &str = r"\d{4}-\d{1,2}-\d{1,2}";

fn day_month_year() -> String {
    format!(r"\d{{1,2}}[ \t]+(?:{MONTH_ALT})[a-z]*\.?,?[ \t]+\d{{4}}")
}

fn month_day_year() -> String {
    format!(r"(?:{MONTH_ALT})[a-z]*\.?[ \t]+\d{{1,2}}(?:st|nd|rd|th)?,?[ \t]+\d{{4}}")
}

fn any_date() -> String {
    format!(
        "{NUMERIC_DATE}|{ISO_DATE}|{}|{}",
        day_month_year(),
        month_day_year()
    )
}

/// Ordered general patterns; the first capture group holds the date text.
static DATE_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    let specs: Vec<(&'static str, String)> = vec![
        (
            "label_numeric",
            format!(
                r"(?i)\b{LABEL}({NUMERIC_DATE})(?:[ \t]+\d{{1,2}}:\d{{2}}(?::\d{{2}})?(?:[ \t]*[AP]M)?)?"
            ),
        ),
        ("label_day_month", format!(r"(?i)\b{LABEL}({})", day_month_year())),
        ("label_month_day", format!(r"(?i)\b{LABEL}({})", month_day_year())),
        ("label_iso", format!(r"(?i)\b{LABEL}({ISO_DATE})")),
        (
            "generated_printed",
            format!(
                r"(?i)\b(?:report[ \t]+)?(?:generated|printed)(?:[ \t]+(?:on|at))?[ \t]*:?[ \t]*({})",
                any_date()
            ),
        ),
        (
            "ordered_completed",
            format!(
                r"(?i)\b(?:ordered|completed)(?:[ \t]+(?:on|at))?[ \t]*:?[ \t]*({})",
                any_date()
            ),
        ),
        ("bare_numeric", r"\b(\d{1,2}/\d{1,2}/\d{4})\b".to_string()),
        ("bare_iso", r"\b(\d{4}-\d{2}-\d{2})\b".to_string()),
    ];

    specs
        .into_iter()
        .map(|(name, pattern)| (name, Regex::new(&pattern).unwrap()))
        .collect()
});

static ISO_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").unwrap());

static NUMERIC_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{2,4})$").unwrap());

static DAY_MONTH_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})\s+([A-Za-z]+)\.?,?\s+(\d{4})$").unwrap());

static MONTH_DAY_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]+)\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})$").unwrap()
});

/// A report date and how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractedDate {
    pub date: NaiveDate,
    pub source: DateSource,
}

impl ExtractedDate {
    /// Midnight UTC of the date.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.date.and_time(chrono::NaiveTime::MIN).and_utc()
    }
}

/// Finds the most likely collection/report date in report text.
#[derive(Debug, Clone)]
pub struct DateExtractor {
    fallback: NaiveDate,
}

impl DateExtractor {
    pub fn new(fallback: NaiveDate) -> Self {
        Self { fallback }
    }

    /// Extract the report date. Never fails: falls back to the configured date.
    pub fn extract(&self, text: &str) -> ExtractedDate {
        if let Some(date) = collection_date_time(text) {
            debug!(%date, "date from collection label");
            return ExtractedDate {
                date,
                source: DateSource::Extracted,
            };
        }

        for (name, pattern) in DATE_PATTERNS.iter() {
            let Some(caps) = pattern.captures(text) else {
                continue;
            };
            let Some(raw) = caps
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str().trim())
                .find(|s| !s.is_empty())
            else {
                continue;
            };

            if let Some(date) = parse_date_string(raw) {
                debug!(pattern = name, raw, %date, "date extracted");
                return ExtractedDate {
                    date,
                    source: DateSource::Extracted,
                };
            }
        }

        debug!(fallback = %self.fallback, "no date pattern matched");
        ExtractedDate {
            date: self.fallback,
            source: DateSource::Fallback,
        }
    }
}

fn collection_date_time(text: &str) -> Option<NaiveDate> {
    let caps = COLLECTION_DATE_TIME.captures(text)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month = month_from_name(caps.get(2)?.as_str())?;
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;
    valid_date(year, month, day)
}

/// Resolve a month name or abbreviation by its first three letters.
fn month_from_name(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == prefix)
        .map(|i| i as u32 + 1)
}

/// Two-digit years below 50 are 20xx, the rest 19xx.
fn expand_year(year: i32, digits: usize) -> i32 {
    if digits == 2 {
        if year < 50 {
            2000 + year
        } else {
            1900 + year
        }
    } else {
        year
    }
}

fn valid_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if year <= 1900 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a captured date string: ISO, `M/D/Y` (US order), or month-name forms.
pub fn parse_date_string(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Some(caps) = ISO_SHAPE.captures(raw) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        return valid_date(year, month, day);
    }

    if let Some(caps) = NUMERIC_SHAPE.captures(raw) {
        let month = caps[1].parse().ok()?;
        let day = caps[2].parse().ok()?;
        let year = expand_year(caps[3].parse().ok()?, caps[3].len());
        return valid_date(year, month, day);
    }

    if let Some(caps) = DAY_MONTH_SHAPE.captures(raw) {
        let day = caps[1].parse().ok()?;
        let month = month_from_name(&caps[2])?;
        let year = caps[3].parse().ok()?;
        return valid_date(year, month, day);
    }

    if let Some(caps) = MONTH_DAY_SHAPE.captures(raw) {
        let month = month_from_name(&caps[1])?;
        let day = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        return valid_date(year, month, day);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format_timestamp;

    fn extractor() -> DateExtractor {
        DateExtractor::new(NaiveDate::from_ymd_opt(2023, 6, 15).unwrap())
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_collection_date_time_label() {
        let text = "Patient: Jane\nCollection Date, Time\n08-Feb-2024\nGlucose: 85 mg/dL";
        let extracted = extractor().extract(text);
        assert_eq!(extracted.date, ymd(2024, 2, 8));
        assert_eq!(extracted.source, DateSource::Extracted);
        assert_eq!(format_timestamp(extracted.timestamp()), "2024-02-08T00:00:00.000Z");
    }

    #[test]
    fn test_collection_label_beats_earlier_generic_date() {
        let text = "Printed: 01/01/2020\nCollection Date, Time\n08-Feb-2024";
        assert_eq!(extractor().extract(text).date, ymd(2024, 2, 8));
    }

    #[test]
    fn test_fallback_when_nothing_matches() {
        let extracted = extractor().extract("Glucose: 85 mg/dL");
        assert_eq!(extracted.source, DateSource::Fallback);
        assert_eq!(format_timestamp(extracted.timestamp()), "2023-06-15T00:00:00.000Z");
    }

    #[test]
    fn test_labelled_numeric_is_month_first() {
        let extracted = extractor().extract("Collection Date: 03/04/2023 10:15 AM");
        assert_eq!(extracted.date, ymd(2023, 3, 4));
    }

    #[test]
    fn test_two_digit_year_pivot() {
        assert_eq!(extractor().extract("Drawn: 1/2/23").date, ymd(2023, 1, 2));
        assert_eq!(extractor().extract("Drawn: 1/2/87").date, ymd(1987, 1, 2));
    }

    #[test]
    fn test_month_name_forms() {
        assert_eq!(extractor().extract("Sample Date: 15 Jan 2023").date, ymd(2023, 1, 15));
        assert_eq!(
            extractor().extract("Report Date: January 15, 2023").date,
            ymd(2023, 1, 15)
        );
        assert_eq!(extractor().extract("Collected on Sept 3rd, 2022").date, ymd(2022, 9, 3));
    }

    #[test]
    fn test_labelled_iso() {
        assert_eq!(extractor().extract("Test Date: 2022-11-30").date, ymd(2022, 11, 30));
    }

    #[test]
    fn test_generated_and_ordered_labels() {
        assert_eq!(
            extractor().extract("Report generated on 2021-05-06").date,
            ymd(2021, 5, 6)
        );
        assert_eq!(extractor().extract("Completed: 7/8/2020").date, ymd(2020, 7, 8));
    }

    #[test]
    fn test_bare_fallback_patterns() {
        assert_eq!(extractor().extract("Results as of 12/25/2022").date, ymd(2022, 12, 25));
        assert_eq!(extractor().extract("ref 2019-04-01 batch").date, ymd(2019, 4, 1));
    }

    #[test]
    fn test_invalid_calendar_date_skipped() {
        // 13/45 is not a date; the bare ISO date later in the text wins
        let text = "Collection Date: 13/45/2023\nstamp 2023-02-01";
        assert_eq!(extractor().extract(text).date, ymd(2023, 2, 1));
    }

    #[test]
    fn test_year_must_exceed_1900() {
        assert_eq!(parse_date_string("1900-01-01"), None);
        assert_eq!(parse_date_string("1901-01-01"), Some(ymd(1901, 1, 1)));
    }

    #[test]
    fn test_parse_date_string_shapes() {
        assert_eq!(parse_date_string("2024-2-8"), Some(ymd(2024, 2, 8)));
        assert_eq!(parse_date_string("02.08.2024"), Some(ymd(2024, 2, 8)));
        assert_eq!(parse_date_string("8 February 2024"), Some(ymd(2024, 2, 8)));
        assert_eq!(parse_date_string("Feb. 8, 2024"), Some(ymd(2024, 2, 8)));
        assert_eq!(parse_date_string("2/30/2024"), None);
        assert_eq!(parse_date_string("soon"), None);
    }
}
