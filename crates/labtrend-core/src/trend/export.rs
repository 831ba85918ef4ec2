//! Trend table export.

use super::TrendTable;
use crate::models::RangeStatus;

impl TrendTable {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format, one row per point.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        // Header
        csv.push_str("biomarker,unit,date,value,ref_min,ref_max,status,flag,source_name\n");

        for series in &self.series {
            let (ref_min, ref_max) = match series.reference_range {
                Some(range) => (range.min.to_string(), range.max.to_string()),
                None => (String::new(), String::new()),
            };
            for point in &series.points {
                csv.push_str(&format!(
                    "{},{},{},{},{},{},{},{},{}\n",
                    escape_csv(&series.name),
                    escape_csv(series.unit.as_deref().unwrap_or("")),
                    escape_csv(&point.date),
                    point.value,
                    ref_min,
                    ref_max,
                    point.status.map(status_label).unwrap_or(""),
                    point.flag.map(|f| f.as_str()).unwrap_or(""),
                    escape_csv(&point.source_name),
                ));
            }
        }

        csv
    }
}

fn status_label(status: RangeStatus) -> &'static str {
    match status {
        RangeStatus::Below => "below",
        RangeStatus::Within => "within",
        RangeStatus::Above => "above",
    }
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
