//! Cross-report trend aggregation.
//!
//! History entries are walked in ascending date order; names are folded to
//! canonical names so "HbA1c" and "Hemoglobin A1c" land in one series.

mod export;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dictionary::BiomarkerDictionary;
use crate::models::{parse_timestamp, Flag, HistoryEntry, RangeStatus, ReferenceRange};
use crate::resolver::{BiomarkerMatcher, Normalizer};

/// One measurement in a series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// ISO-8601 test date of the report
    pub date: String,
    pub value: f64,
    /// Name as printed in that report
    pub source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RangeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<Flag>,
}

/// All measurements of one canonical biomarker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendSeries {
    pub name: String,
    /// Latest known unit
    pub unit: Option<String>,
    /// Latest known reference range
    pub reference_range: Option<ReferenceRange>,
    /// Ascending by date
    pub points: Vec<TrendPoint>,
}

/// Series in first-appearance order plus the distinct report dates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendTable {
    pub dates: Vec<String>,
    pub series: Vec<TrendSeries>,
}

impl TrendTable {
    pub fn get(&self, name: &str) -> Option<&TrendSeries> {
        self.series.iter().find(|s| s.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Builds a [`TrendTable`] from history entries.
pub struct TrendBuilder<'a> {
    normalizer: Normalizer,
    dictionary: &'a BiomarkerDictionary,
    matcher: &'a dyn BiomarkerMatcher,
}

impl<'a> TrendBuilder<'a> {
    pub fn new(dictionary: &'a BiomarkerDictionary, matcher: &'a dyn BiomarkerMatcher) -> Self {
        Self {
            normalizer: Normalizer::new(),
            dictionary,
            matcher,
        }
    }

    /// Replace the default name/unit normalizer.
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Aggregate entries into series. Entries with an unparseable date are
    /// skipped.
    pub fn build(&self, entries: &[HistoryEntry]) -> TrendTable {
        let mut dated: Vec<_> = entries
            .iter()
            .filter_map(|entry| match parse_timestamp(&entry.date) {
                Some(ts) => Some((ts, entry)),
                None => {
                    warn!(date = %entry.date, "skipping history entry with invalid date");
                    None
                }
            })
            .collect();
        // stable: same-date entries keep input order
        dated.sort_by_key(|(ts, _)| *ts);

        let mut table = TrendTable::default();
        let mut index: HashMap<String, usize> = HashMap::new();

        for (_, entry) in dated {
            if table.dates.last() != Some(&entry.date) {
                table.dates.push(entry.date.clone());
            }

            let mut observations: Vec<_> = entry.biomarkers.iter().collect();
            observations.sort_by_key(|(_, obs)| obs.order_index.unwrap_or(usize::MAX));

            for (raw_name, observation) in observations {
                let Some(value) = observation.value else {
                    continue;
                };
                let name = self
                    .normalizer
                    .canonical_name(raw_name, self.dictionary, self.matcher);

                let slot = *index.entry(name.clone()).or_insert_with(|| {
                    table.series.push(TrendSeries {
                        name,
                        unit: None,
                        reference_range: None,
                        points: Vec::new(),
                    });
                    table.series.len() - 1
                });
                let series = &mut table.series[slot];

                if let Some(unit) = &observation.unit {
                    series.unit = Some(self.normalizer.canonical_unit(unit));
                }
                if observation.reference_range.is_some() {
                    series.reference_range = observation.reference_range;
                }
                series.points.push(TrendPoint {
                    date: entry.date.clone(),
                    value,
                    source_name: raw_name.to_string(),
                    status: observation.status(),
                    flag: observation.flag,
                });
            }
        }

        debug!(
            entries = entries.len(),
            series = table.series.len(),
            "built trend table"
        );
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BiomarkerMap, BiomarkerObservation};
    use crate::resolver::SubstringMatcher;

    fn obs(value: f64, unit: &str, order: usize) -> BiomarkerObservation {
        BiomarkerObservation {
            value: Some(value),
            unit: Some(unit.into()),
            reference_range: None,
            order_index: Some(order),
            flag: None,
        }
    }

    fn entry(date: &str, items: Vec<(&str, BiomarkerObservation)>) -> HistoryEntry {
        let mut biomarkers = BiomarkerMap::new();
        for (name, observation) in items {
            biomarkers.insert(name, observation);
        }
        HistoryEntry {
            date: date.into(),
            biomarkers,
        }
    }

    fn build(entries: &[HistoryEntry]) -> TrendTable {
        TrendBuilder::new(BiomarkerDictionary::builtin(), &SubstringMatcher).build(entries)
    }

    #[test]
    fn test_aliases_fold_into_one_series() {
        let table = build(&[
            entry("2024-01-10T00:00:00.000Z", vec![("HbA1c", obs(5.9, "%", 0))]),
            entry("2023-07-01T00:00:00.000Z", vec![("Hemoglobin A1c", obs(5.6, "%", 0))]),
        ]);

        assert_eq!(table.series.len(), 1);
        let series = table.get("Hemoglobin A1c").unwrap();
        let values: Vec<f64> = series.points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![5.6, 5.9]);
        assert_eq!(series.points[1].source_name, "HbA1c");
        assert_eq!(
            table.dates,
            vec!["2023-07-01T00:00:00.000Z", "2024-01-10T00:00:00.000Z"]
        );
    }

    #[test]
    fn test_series_order_follows_earliest_report() {
        let table = build(&[
            entry(
                "2024-02-01T00:00:00.000Z",
                vec![("Zinc", obs(90.0, "ug/dL", 0)), ("Sodium", obs(139.0, "mmol/l", 1))],
            ),
            entry(
                "2023-02-01T00:00:00.000Z",
                vec![("Glucose", obs(88.0, "mg/dl", 1)), ("Sodium", obs(141.0, "mmol/L", 0))],
            ),
        ]);

        let names: Vec<&str> = table.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Sodium", "Glucose", "Zinc"]);
        assert_eq!(table.get("Glucose").unwrap().unit.as_deref(), Some("mg/dL"));
        assert_eq!(table.get("Sodium").unwrap().unit.as_deref(), Some("mmol/L"));
    }

    #[test]
    fn test_latest_range_wins() {
        let mut older = obs(150.0, "mg/dL", 0);
        older.reference_range = ReferenceRange::new(0.0, 150.0);
        let mut newer = obs(120.0, "mg/dL", 0);
        newer.reference_range = ReferenceRange::new(0.0, 140.0);
        let no_range = obs(110.0, "mg/dL", 0);

        let table = build(&[
            entry("2023-01-01T00:00:00.000Z", vec![("Triglycerides", older)]),
            entry("2023-06-01T00:00:00.000Z", vec![("Triglycerides", newer)]),
            entry("2023-09-01T00:00:00.000Z", vec![("Triglycerides", no_range)]),
        ]);

        let series = table.get("Triglycerides").unwrap();
        assert_eq!(series.reference_range, ReferenceRange::new(0.0, 140.0));
        assert_eq!(series.points[0].status, Some(RangeStatus::Within));
        assert_eq!(series.points[2].status, None);
    }

    #[test]
    fn test_invalid_dates_and_missing_values_skipped() {
        let mut missing = obs(0.0, "mg/dL", 0);
        missing.value = None;
        let table = build(&[
            entry("not a date", vec![("Glucose", obs(90.0, "mg/dL", 0))]),
            entry("2023-01-01T00:00:00.000Z", vec![("Glucose", missing)]),
        ]);

        assert!(table.is_empty());
        assert_eq!(table.dates, vec!["2023-01-01T00:00:00.000Z"]);
    }

    #[test]
    fn test_empty_history() {
        let table = build(&[]);
        assert!(table.is_empty());
        assert!(table.dates.is_empty());
    }
}
