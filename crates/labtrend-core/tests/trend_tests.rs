//! End-to-end tests: analyze reports, store them, build trends.

use labtrend_core::models::{AnalysisResult, RangeStatus};
use labtrend_core::resolver::SubstringMatcher;
use labtrend_core::{
    open_history_store_in_memory, BiomarkerDictionary, Database, ReportAnalyzer, TrendBuilder,
    TrendTable,
};

const MARCH_2024: &str = "Collected: 03/15/2024\nGlucose: 105 mg/dL\nHbA1c: 5.9 %\n";
const SEPT_2023: &str = "Collected: 09/01/2023\nGlucose: 92 mg/dl\nHemoglobin A1c: 5.6 %\n";

fn pages(text: &str) -> Vec<String> {
    vec![text.to_string()]
}

#[test]
fn test_store_round_trip_to_trend_table() {
    let store = open_history_store_in_memory().unwrap();

    // newer report first; the table must still be date ordered
    let march = store
        .analyze_and_record("march.pdf".into(), pages(MARCH_2024))
        .unwrap();
    store
        .analyze_and_record("sept.pdf".into(), pages(SEPT_2023))
        .unwrap();

    assert_eq!(march.test_date, "2024-03-15T00:00:00.000Z");
    assert_eq!(march.date_source, "extracted");
    assert_eq!(march.original_order, vec!["Glucose", "HbA1c"]);
    assert_eq!(store.history_count().unwrap(), 2);

    let table: TrendTable = serde_json::from_str(&store.trend_table_json().unwrap()).unwrap();
    assert_eq!(
        table.dates,
        vec!["2023-09-01T00:00:00.000Z", "2024-03-15T00:00:00.000Z"]
    );

    let names: Vec<&str> = table.series.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Glucose", "Hemoglobin A1c"]);

    let glucose = table.get("Glucose").unwrap();
    assert_eq!(glucose.unit.as_deref(), Some("mg/dL"));
    let values: Vec<f64> = glucose.points.iter().map(|p| p.value).collect();
    assert_eq!(values, vec![92.0, 105.0]);
    assert_eq!(glucose.points[0].status, Some(RangeStatus::Within));
    assert_eq!(glucose.points[1].status, Some(RangeStatus::Above));

    let a1c = table.get("Hemoglobin A1c").unwrap();
    let sources: Vec<&str> = a1c.points.iter().map(|p| p.source_name.as_str()).collect();
    assert_eq!(sources, vec!["Hemoglobin A1c", "HbA1c"]);
    assert_eq!(a1c.reference_range.map(|r| (r.min, r.max)), Some((4.0, 5.6)));
    assert_eq!(a1c.points[1].status, None);
}

#[test]
fn test_csv_has_one_row_per_point() {
    let store = open_history_store_in_memory().unwrap();
    store
        .analyze_and_record("march.pdf".into(), pages(MARCH_2024))
        .unwrap();
    store
        .analyze_and_record("sept.pdf".into(), pages(SEPT_2023))
        .unwrap();

    let csv = store.trend_table_csv().unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 5);
    assert!(lines[1].starts_with("Glucose,mg/dL,2023-09-01T00:00:00.000Z,92,70,100,within"));
}

#[test]
fn test_clear_history_empties_trends() {
    let store = open_history_store_in_memory().unwrap();
    store
        .analyze_and_record("march.pdf".into(), pages(MARCH_2024))
        .unwrap();

    assert_eq!(store.clear_history().unwrap(), 1);
    assert_eq!(store.history_count().unwrap(), 0);

    let table: TrendTable = serde_json::from_str(&store.trend_table_json().unwrap()).unwrap();
    assert!(table.is_empty());
    assert!(table.dates.is_empty());
}

#[test]
fn test_history_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");
    let analyzer = ReportAnalyzer::default();

    {
        let db = Database::open(&path).unwrap();
        db.append_result(&analyzer.analyze_text("sept.pdf", SEPT_2023))
            .unwrap();
        let failed = AnalysisResult::failed("broken.pdf", "Invalid PDF structure", chrono::Utc::now());
        assert!(!db.append_result(&failed).unwrap());
    }

    let db = Database::open(&path).unwrap();
    let history = db.list_history().unwrap();
    assert_eq!(history.len(), 1);

    let table = TrendBuilder::new(BiomarkerDictionary::builtin(), &SubstringMatcher).build(&history);
    assert_eq!(table.series.len(), 2);
    assert_eq!(table.get("Glucose").unwrap().points[0].value, 92.0);
}
