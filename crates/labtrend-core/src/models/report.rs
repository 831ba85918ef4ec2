//! Per-file analysis results and history entries.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::BiomarkerMap;

/// How the test date of a result was obtained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DateSource {
    /// Parsed from a date pattern in the report
    Extracted,
    /// No pattern matched; the configured fallback date was used
    Fallback,
    /// Decoding failed; the processing time was used
    ProcessingTime,
}

impl DateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateSource::Extracted => "extracted",
            DateSource::Fallback => "fallback",
            DateSource::ProcessingTime => "processingTime",
        }
    }
}

/// Render a timestamp as ISO-8601 with milliseconds and a `Z` suffix.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a timestamp produced by [`format_timestamp`] (or any RFC 3339 string).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Result of analyzing one uploaded file. Built once, never mutated after.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub file_name: String,
    /// ISO-8601 timestamp, always present
    pub test_date: String,
    pub date_source: DateSource,
    pub biomarkers: BiomarkerMap,
    /// Names in first-accepted order; mirrors `biomarkers` insertion order
    pub original_order: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    /// Build a successful result from an ordered biomarker map.
    pub fn new(
        file_name: impl Into<String>,
        test_date: DateTime<Utc>,
        date_source: DateSource,
        biomarkers: BiomarkerMap,
    ) -> Self {
        let original_order = biomarkers.names();
        Self {
            file_name: file_name.into(),
            test_date: format_timestamp(test_date),
            date_source,
            biomarkers,
            original_order,
            error: None,
        }
    }

    /// Build the result for a file whose text could not be obtained.
    pub fn failed(file_name: impl Into<String>, error: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            file_name: file_name.into(),
            test_date: format_timestamp(now),
            date_source: DateSource::ProcessingTime,
            biomarkers: BiomarkerMap::new(),
            original_order: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// History entry for trend aggregation. Failed results have none.
    pub fn to_history_entry(&self) -> Option<HistoryEntry> {
        if self.is_error() {
            return None;
        }
        Some(HistoryEntry {
            date: self.test_date.clone(),
            biomarkers: self.biomarkers.clone(),
        })
    }
}

/// One report's contribution to the biomarker history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    /// ISO-8601 test date
    pub date: String,
    pub biomarkers: BiomarkerMap,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BiomarkerObservation;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp_millis_z() {
        let ts = Utc.with_ymd_and_hms(2023, 6, 15, 0, 0, 0).unwrap();
        assert_eq!(format_timestamp(ts), "2023-06-15T00:00:00.000Z");
        assert_eq!(parse_timestamp("2023-06-15T00:00:00.000Z"), Some(ts));
    }

    #[test]
    fn test_new_mirrors_insertion_order() {
        let mut map = BiomarkerMap::new();
        for (i, name) in ["Glucose", "Sodium"].iter().enumerate() {
            map.insert(
                *name,
                BiomarkerObservation {
                    value: Some(1.0),
                    unit: None,
                    reference_range: None,
                    order_index: Some(i),
                    flag: None,
                },
            );
        }
        let ts = Utc.with_ymd_and_hms(2024, 2, 8, 0, 0, 0).unwrap();
        let result = AnalysisResult::new("a.pdf", ts, DateSource::Extracted, map);

        assert_eq!(result.original_order, vec!["Glucose", "Sodium"]);
        assert!(result.to_history_entry().is_some());
    }

    #[test]
    fn test_failed_result_shape() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let result = AnalysisResult::failed("broken.pdf", "Invalid PDF structure", now);

        assert!(result.is_error());
        assert!(result.biomarkers.is_empty());
        assert_eq!(result.date_source, DateSource::ProcessingTime);
        assert_eq!(result.test_date, "2026-01-02T03:04:05.000Z");
        assert!(result.to_history_entry().is_none());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["fileName"], "broken.pdf");
        assert_eq!(json["dateSource"], "processingTime");
        assert_eq!(json["error"], "Invalid PDF structure");
    }
}
