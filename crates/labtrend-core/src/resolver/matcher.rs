//! Known-biomarker matching strategies.
//!
//! The pipeline only ever asks "which dictionary entry, if any, does this
//! name refer to?". [`SubstringMatcher`] is the default answer;
//! [`SimilarityMatcher`] is a stricter drop-in.

use strsim::{jaro_winkler, normalized_levenshtein};

use crate::dictionary::BiomarkerDictionary;
use crate::models::BiomarkerDefinition;

/// Maps a candidate name to a dictionary entry.
pub trait BiomarkerMatcher: Send + Sync {
    fn find<'d>(
        &self,
        dictionary: &'d BiomarkerDictionary,
        name: &str,
    ) -> Option<&'d BiomarkerDefinition>;

    /// Whether the name refers to any known biomarker.
    fn is_known(&self, dictionary: &BiomarkerDictionary, name: &str) -> bool {
        self.find(dictionary, name).is_some()
    }
}

/// Case-insensitive equality, else substring containment in either
/// direction against entries in dictionary order.
///
/// Blunt by nature: "Iron Binding Capacity" resolves to "Iron".
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl BiomarkerMatcher for SubstringMatcher {
    fn find<'d>(
        &self,
        dictionary: &'d BiomarkerDictionary,
        name: &str,
    ) -> Option<&'d BiomarkerDefinition> {
        let query = name.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }

        if let Some((_, definition)) = dictionary.iter_lowered().find(|(entry, _)| *entry == query) {
            return Some(definition);
        }

        dictionary
            .iter_lowered()
            .find(|(entry, _)| entry.contains(query.as_str()) || query.contains(entry))
            .map(|(_, definition)| definition)
    }
}

/// Minimum combined similarity for a match.
const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.88;

/// Edit-distance matching: best entry by a Jaro-Winkler / Levenshtein blend,
/// accepted above a threshold.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityMatcher {
    threshold: f64,
}

impl Default for SimilarityMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl SimilarityMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl BiomarkerMatcher for SimilarityMatcher {
    fn find<'d>(
        &self,
        dictionary: &'d BiomarkerDictionary,
        name: &str,
    ) -> Option<&'d BiomarkerDefinition> {
        let query = name.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }

        let mut best: Option<(f64, &'d BiomarkerDefinition)> = None;
        for (entry, definition) in dictionary.iter_lowered() {
            let score = similarity(&query, entry);
            // strictly greater keeps the earliest entry on ties
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, definition));
            }
        }

        best.filter(|(score, _)| *score >= self.threshold)
            .map(|(_, definition)| definition)
    }
}

/// Combined string similarity in [0, 1].
fn similarity(a: &str, b: &str) -> f64 {
    jaro_winkler(a, b) * 0.6 + normalized_levenshtein(a, b) * 0.4
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dictionary() -> &'static BiomarkerDictionary {
        BiomarkerDictionary::builtin()
    }

    #[test]
    fn test_substring_exact_match() {
        let found = SubstringMatcher.find(dictionary(), "glucose").unwrap();
        assert_eq!(found.name, "Glucose");

        // exact beats an earlier containing entry
        let found = SubstringMatcher.find(dictionary(), "MCH").unwrap();
        assert_eq!(found.name, "MCH");
    }

    #[test]
    fn test_substring_containment_both_directions() {
        // candidate inside entry
        let found = SubstringMatcher.find(dictionary(), "Cholesterol").unwrap();
        assert_eq!(found.name, "Total Cholesterol");

        // entry inside candidate
        let found = SubstringMatcher.find(dictionary(), "Fasting Glucose").unwrap();
        assert_eq!(found.name, "Glucose");

        let found = SubstringMatcher.find(dictionary(), "Vitamin D, 25-Hydroxy").unwrap();
        assert_eq!(found.name, "Vitamin D");
    }

    #[test]
    fn test_substring_no_match() {
        assert!(SubstringMatcher.find(dictionary(), "Unobtainium").is_none());
        assert!(SubstringMatcher.find(dictionary(), "   ").is_none());
        assert!(!SubstringMatcher.is_known(dictionary(), "Zebra"));
    }

    #[test]
    fn test_similarity_tolerates_typos() {
        let matcher = SimilarityMatcher::default();
        let found = matcher.find(dictionary(), "Glucos").unwrap();
        assert_eq!(found.name, "Glucose");

        let found = matcher.find(dictionary(), "Trigylcerides").unwrap();
        assert_eq!(found.name, "Triglycerides");
    }

    #[test]
    fn test_similarity_is_stricter_than_substring() {
        let matcher = SimilarityMatcher::default();
        // substring matching would resolve this to "Iron"
        assert!(matcher.find(dictionary(), "Total Iron Binding Capacity").is_none());
        assert!(SubstringMatcher.find(dictionary(), "Total Iron Binding Capacity").is_some());
    }

    #[test]
    fn test_similarity_scores() {
        assert!(similarity("glucose", "glucose") > 0.99);
        assert!(similarity("glucose", "sodium") < 0.6);
    }
}
