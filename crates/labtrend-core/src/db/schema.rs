//! SQLite schema definition.

/// Complete database schema for labtrend.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Analysis History (append-only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS analysis_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_name TEXT NOT NULL,
    test_date TEXT NOT NULL,                     -- ISO-8601, milliseconds, Z
    date_source TEXT NOT NULL,                   -- extracted | fallback
    biomarkers TEXT NOT NULL,                    -- JSON object, insertion order
    original_order TEXT NOT NULL DEFAULT '[]',   -- JSON array of names
    recorded_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_history_test_date ON analysis_history(test_date);
"#;
