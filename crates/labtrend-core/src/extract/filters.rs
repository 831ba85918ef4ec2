//! Plausibility filters applied to every scanner hit.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ExtractionConfig;
use crate::dictionary::BiomarkerDictionary;
use crate::resolver::BiomarkerMatcher;

/// Fragments that mark a "name" as address, contact, company or URL text
/// rather than a biomarker.
static EXCLUSION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(?:street|st\.|avenue|ave|road|rd\.|suite|ste\.|blvd|boulevard|lane|ln\.|p\.?\s*o\.?\s*box|zip)\b",
        r"(?i)\b(?:phone|tel|telephone|fax|e-?mail|contact|call)\b",
        r"(?i)(?:https?://|www\.|\.com\b|\.org\b|\.net\b|@)",
        r"(?i)\b(?:inc|llc|ltd|corp|corporation|laborator(?:y|ies)|labs|clinic|hospital|diagnostics)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Column and section headings that look like names.
const SECTION_HEADERS: &[&str] = &[
    "complete blood count",
    "cbc with differential",
    "lipid panel",
    "lipid profile",
    "comprehensive metabolic panel",
    "basic metabolic panel",
    "liver function tests",
    "liver panel",
    "kidney function",
    "renal panel",
    "thyroid panel",
    "iron panel",
    "hematology",
    "chemistry",
    "urinalysis",
    "test name",
    "lab results",
    "laboratory report",
    "final report",
];

/// Demographic and record fields. A name made only of these (and column
/// labels) is a header row, e.g. "Patient ID" or "Age".
const FIELD_WORDS: &[&str] = &[
    "patient", "physician", "doctor", "dr", "provider", "dob", "birth", "age", "sex", "gender",
    "account", "acct", "accession", "specimen", "npi", "mrn", "id", "ordering",
];

/// Column labels. Besides forming whole header names, they never start a
/// biomarker name: "Result Glucose" is a label in front of "Glucose".
const LABEL_WORDS: &[&str] = &[
    "reference", "range", "interval", "normal", "unit", "units", "result", "results", "flag",
    "comment", "comments", "note", "notes",
];

/// Single words that are never biomarkers on their own unless the
/// dictionary says otherwise.
const COMMON_WORDS: &[&str] = &[
    "test", "tests", "date", "page", "time", "value", "total", "level", "report", "sample",
    "name", "final", "status", "high", "low", "lab", "panel", "count", "free", "serum",
    "plasma", "blood", "urine", "fasting", "collected", "received", "reported",
];

static DATE_OR_TIME_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)date|time").unwrap());

static DATE_LIKE_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}").unwrap());

/// Name and value checks shared by all scanner passes.
pub struct CandidateFilter<'a> {
    config: &'a ExtractionConfig,
    dictionary: &'a BiomarkerDictionary,
    matcher: &'a dyn BiomarkerMatcher,
}

impl<'a> CandidateFilter<'a> {
    pub fn new(
        config: &'a ExtractionConfig,
        dictionary: &'a BiomarkerDictionary,
        matcher: &'a dyn BiomarkerMatcher,
    ) -> Self {
        Self {
            config,
            dictionary,
            matcher,
        }
    }

    /// Whether a captured name could plausibly be a biomarker.
    pub fn is_plausible_name(&self, name: &str) -> bool {
        let trimmed = name.trim();
        let len = trimmed.chars().count();
        if len < self.config.min_name_len || len > self.config.max_name_len {
            return false;
        }

        if EXCLUSION_PATTERNS.iter().any(|re| re.is_match(trimmed)) {
            return false;
        }

        if DATE_OR_TIME_WORD.is_match(trimmed) {
            return false;
        }

        let lower = trimmed.to_lowercase();
        if is_section_header(&lower) {
            return false;
        }

        if is_field_label(&lower) {
            return false;
        }

        if COMMON_WORDS.contains(&lower.as_str()) {
            return self.matcher.is_known(self.dictionary, trimmed);
        }

        true
    }

    /// Whether a value is inside the coarse accepted bounds.
    pub fn is_plausible_value(&self, value: f64) -> bool {
        value.is_finite() && value >= 0.0 && value <= self.config.max_value
    }
}

/// Exact (case-insensitive) section heading check.
pub fn is_section_header(name: &str) -> bool {
    let lower = name.trim().to_lowercase();
    SECTION_HEADERS.contains(&lower.as_str())
}

/// Whole-name demographic/label check, or a name led by a column label.
fn is_field_label(lower: &str) -> bool {
    let words: Vec<&str> = lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect();
    let Some(first) = words.first() else {
        return false;
    };
    if LABEL_WORDS.contains(first) {
        return true;
    }
    words
        .iter()
        .all(|w| FIELD_WORDS.contains(w) || LABEL_WORDS.contains(w))
}

/// Whether the text starting at a value position is a `D/D/YYYY` date.
pub fn is_date_like(text_from_value: &str) -> bool {
    DATE_LIKE_VALUE.is_match(text_from_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::SubstringMatcher;

    fn with_filter<F: FnOnce(&CandidateFilter)>(f: F) {
        let config = ExtractionConfig::default();
        let filter = CandidateFilter::new(&config, BiomarkerDictionary::builtin(), &SubstringMatcher);
        f(&filter);
    }

    #[test]
    fn test_accepts_biomarker_names() {
        with_filter(|filter| {
            assert!(filter.is_plausible_name("Glucose"));
            assert!(filter.is_plausible_name("Vitamin B12"));
            assert!(filter.is_plausible_name("Some Novel Marker"));
        });
    }

    #[test]
    fn test_length_bounds() {
        with_filter(|filter| {
            assert!(!filter.is_plausible_name("K"));
            assert!(!filter.is_plausible_name("Na"));
            assert!(!filter.is_plausible_name(&"x".repeat(61)));
            assert!(filter.is_plausible_name(&"x".repeat(60)));
        });
    }

    #[test]
    fn test_exclusion_patterns() {
        with_filter(|filter| {
            assert!(!filter.is_plausible_name("123 Main Street"));
            assert!(!filter.is_plausible_name("Phone"));
            assert!(!filter.is_plausible_name("www.example.com"));
            assert!(!filter.is_plausible_name("Acme Laboratories"));
        });
    }

    #[test]
    fn test_field_and_label_names() {
        with_filter(|filter| {
            assert!(!filter.is_plausible_name("Patient Age"));
            assert!(!filter.is_plausible_name("Patient ID"));
            assert!(!filter.is_plausible_name("Sex"));
            assert!(!filter.is_plausible_name("Reference Range"));
            assert!(!filter.is_plausible_name("(Reference Range"));
            assert!(!filter.is_plausible_name("Result Glucose"));

            // field words inside a longer name are fine
            assert!(filter.is_plausible_name("Sex Hormone Binding Globulin"));
            assert!(filter.is_plausible_name("Glucose Result"));
        });
    }

    #[test]
    fn test_date_and_time_names() {
        with_filter(|filter| {
            assert!(!filter.is_plausible_name("Collection Date"));
            assert!(!filter.is_plausible_name("Draw Time"));
        });
    }

    #[test]
    fn test_section_headers() {
        with_filter(|filter| {
            assert!(!filter.is_plausible_name("Lipid Panel"));
            assert!(!filter.is_plausible_name("COMPLETE BLOOD COUNT"));
        });
    }

    #[test]
    fn test_common_words_need_dictionary() {
        with_filter(|filter| {
            assert!(!filter.is_plausible_name("Sample"));
            assert!(!filter.is_plausible_name("page"));
            // "test" occurs within "Testosterone"
            assert!(filter.is_plausible_name("Test"));
            // "total" occurs within "Total Cholesterol"
            assert!(filter.is_plausible_name("Total"));
        });
    }

    #[test]
    fn test_value_bounds() {
        with_filter(|filter| {
            assert!(filter.is_plausible_value(0.0));
            assert!(filter.is_plausible_value(100_000.0));
            assert!(!filter.is_plausible_value(-1.0));
            assert!(!filter.is_plausible_value(100_001.0));
            assert!(!filter.is_plausible_value(f64::NAN));
        });
    }

    #[test]
    fn test_date_like() {
        assert!(is_date_like("01/15/2024 08:00"));
        assert!(is_date_like("1-2-24"));
        assert!(!is_date_like("5.6 %"));
    }
}
