//! Analysis history operations.

use rusqlite::params;

use super::{Database, DbResult};
use crate::models::{AnalysisResult, BiomarkerMap, DateSource, HistoryEntry};

impl Database {
    /// Append a result to the history. Failed results are not stored;
    /// returns whether a row was written.
    pub fn append_result(&self, result: &AnalysisResult) -> DbResult<bool> {
        if result.is_error() {
            return Ok(false);
        }

        let biomarkers_json = serde_json::to_string(&result.biomarkers)?;
        let order_json = serde_json::to_string(&result.original_order)?;

        self.conn.execute(
            r#"
            INSERT INTO analysis_history (
                file_name, test_date, date_source, biomarkers, original_order
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                result.file_name,
                result.test_date,
                result.date_source.as_str(),
                biomarkers_json,
                order_json,
            ],
        )?;
        Ok(true)
    }

    /// All stored results in insertion order.
    pub fn list_results(&self) -> DbResult<Vec<AnalysisResult>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT file_name, test_date, date_source, biomarkers, original_order
            FROM analysis_history
            ORDER BY id ASC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(HistoryRow {
                file_name: row.get(0)?,
                test_date: row.get(1)?,
                date_source: row.get(2)?,
                biomarkers: row.get(3)?,
                original_order: row.get(4)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?.try_into()?);
        }
        Ok(results)
    }

    /// History entries (date + biomarkers) in insertion order.
    pub fn list_history(&self) -> DbResult<Vec<HistoryEntry>> {
        Ok(self
            .list_results()?
            .iter()
            .filter_map(AnalysisResult::to_history_entry)
            .collect())
    }

    /// Number of stored results.
    pub fn count_history(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM analysis_history", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Delete all history. Returns the number of removed rows.
    pub fn clear_history(&self) -> DbResult<usize> {
        Ok(self.conn.execute("DELETE FROM analysis_history", [])?)
    }
}

/// Intermediate row struct for database mapping.
struct HistoryRow {
    file_name: String,
    test_date: String,
    date_source: String,
    biomarkers: String,
    original_order: String,
}

impl TryFrom<HistoryRow> for AnalysisResult {
    type Error = super::DbError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let date_source: DateSource =
            serde_json::from_value(serde_json::Value::String(row.date_source))?;
        let biomarkers: BiomarkerMap = serde_json::from_str(&row.biomarkers)?;
        let original_order: Vec<String> = serde_json::from_str(&row.original_order)?;

        Ok(AnalysisResult {
            file_name: row.file_name,
            test_date: row.test_date,
            date_source,
            biomarkers,
            original_order,
            error: None,
        })
    }
}
