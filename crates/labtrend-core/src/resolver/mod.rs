//! Name resolution for scanned candidates.
//!
//! Pipeline: Candidates → Dictionary Pass → Unknown-Name Pass → Range Backfill

mod matcher;
mod normalizer;

pub use matcher::*;
pub use normalizer::*;

use tracing::debug;

use crate::dictionary::BiomarkerDictionary;
use crate::extract::RangeEnricher;
use crate::models::{BiomarkerDefinition, BiomarkerMap, BiomarkerObservation, CandidateMatch};

/// Two-pass resolver that turns offset-ordered candidates into the ordered
/// report mapping.
pub struct Resolver<'a> {
    dictionary: &'a BiomarkerDictionary,
    matcher: &'a dyn BiomarkerMatcher,
    enricher: RangeEnricher,
}

impl<'a> Resolver<'a> {
    /// Create a new resolver.
    pub fn new(
        dictionary: &'a BiomarkerDictionary,
        matcher: &'a dyn BiomarkerMatcher,
        enricher: RangeEnricher,
    ) -> Self {
        Self {
            dictionary,
            matcher,
            enricher,
        }
    }

    /// Build the mapping for one report.
    ///
    /// Dictionary-matched candidates are accepted first, then the rest. A
    /// name that is already in the mapping is skipped, so the earliest
    /// mention wins. Order indices follow acceptance order.
    pub fn resolve(&self, text: &str, candidates: &[CandidateMatch]) -> BiomarkerMap {
        let mut biomarkers = BiomarkerMap::new();

        let (known, unknown): (Vec<_>, Vec<_>) = candidates
            .iter()
            .map(|candidate| (candidate, self.matcher.find(self.dictionary, &candidate.name)))
            .partition(|(_, definition)| definition.is_some());

        // Pass 1: dictionary matches get dictionary defaults
        for (candidate, definition) in known {
            self.accept(text, candidate, definition, &mut biomarkers);
        }

        // Pass 2: everything else
        for (candidate, _) in unknown {
            self.accept(text, candidate, None, &mut biomarkers);
        }

        let filled = self.enricher.backfill(text, &mut biomarkers);
        debug!(
            accepted = biomarkers.len(),
            candidates = candidates.len(),
            backfilled = filled,
            "resolved biomarkers"
        );
        biomarkers
    }

    fn accept(
        &self,
        text: &str,
        candidate: &CandidateMatch,
        definition: Option<&BiomarkerDefinition>,
        biomarkers: &mut BiomarkerMap,
    ) {
        if biomarkers.contains(&candidate.name) {
            return;
        }

        let reference_range = candidate
            .reference_range
            .or_else(|| self.enricher.find_in_context(text, candidate.offset))
            .or_else(|| definition.map(|d| d.range));
        let unit = candidate
            .unit
            .clone()
            .or_else(|| definition.map(|d| d.unit.clone()));

        let observation = BiomarkerObservation {
            value: Some(candidate.value),
            unit,
            reference_range,
            order_index: Some(biomarkers.len()),
            flag: candidate.flag,
        };
        biomarkers.insert(candidate.name.clone(), observation);
    }
}
