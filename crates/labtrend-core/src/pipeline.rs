//! Per-file analysis: date, candidates, resolution, enrichment.

use tracing::{debug, info};

use crate::config::ExtractionConfig;
use crate::dictionary::BiomarkerDictionary;
use crate::extract::{CandidateScanner, DateExtractor, RangeEnricher};
use crate::models::{AnalysisResult, CandidateMatch};
use crate::resolver::{BiomarkerMatcher, Resolver, SubstringMatcher};

/// Runs the whole extraction pipeline for one report at a time.
///
/// Holds no per-report state, so one analyzer can be shared across threads.
pub struct ReportAnalyzer {
    config: ExtractionConfig,
    dictionary: BiomarkerDictionary,
    matcher: Box<dyn BiomarkerMatcher>,
}

impl Default for ReportAnalyzer {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

impl ReportAnalyzer {
    /// Analyzer over the built-in dictionary with substring matching.
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            config,
            dictionary: BiomarkerDictionary::builtin().clone(),
            matcher: Box::new(SubstringMatcher),
        }
    }

    /// Swap the name-matching rule.
    pub fn with_matcher<M: BiomarkerMatcher + 'static>(mut self, matcher: M) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    /// Swap the dictionary.
    pub fn with_dictionary(mut self, dictionary: BiomarkerDictionary) -> Self {
        self.dictionary = dictionary;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn dictionary(&self) -> &BiomarkerDictionary {
        &self.dictionary
    }

    pub fn matcher(&self) -> &dyn BiomarkerMatcher {
        self.matcher.as_ref()
    }

    /// Analyze decoded pages; they are joined with `\n`.
    pub fn analyze_pages<S: AsRef<str>>(&self, file_name: &str, pages: &[S]) -> AnalysisResult {
        let text = pages
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join("\n");
        self.analyze_text(file_name, &text)
    }

    /// Analyze the full text of one report.
    pub fn analyze_text(&self, file_name: &str, text: &str) -> AnalysisResult {
        let date = DateExtractor::new(self.config.fallback_date).extract(text);
        let candidates = self.scan(text);

        let resolver = Resolver::new(
            &self.dictionary,
            self.matcher.as_ref(),
            RangeEnricher::new(&self.config),
        );
        let biomarkers = resolver.resolve(text, &candidates);

        info!(
            file = file_name,
            date = %date.date,
            date_source = date.source.as_str(),
            biomarkers = biomarkers.len(),
            "analyzed report"
        );

        AnalysisResult::new(file_name, date.timestamp(), date.source, biomarkers)
    }

    /// Scanner output for a text, before resolution.
    pub fn scan(&self, text: &str) -> Vec<CandidateMatch> {
        let scanner = CandidateScanner::new(&self.config, &self.dictionary, self.matcher.as_ref());
        let candidates = scanner.scan(text);
        debug!(count = candidates.len(), "scanned candidates");
        candidates
    }
}
