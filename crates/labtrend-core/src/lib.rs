//! LabTrend Core Library
//!
//! Turns decoded lab-report text into ordered biomarker observations and
//! aggregates them into per-biomarker trends.
//!
//! # Architecture
//!
//! ```text
//! Page texts ──join("\n")──▶ Report text
//!                                │
//!              ┌─────────────────┼──────────────────┐
//!              ▼                 ▼                  │
//!        Date Extractor   Candidate Scanner         │
//!              │          (5 regex passes,          │
//!              │           filters, merge)          │
//!              │                 │                  │
//!              │                 ▼                  │
//!              │          Name Resolver ◀── Range Enricher
//!              │       (dictionary pass,            │
//!              │        unknown-name pass)          │
//!              │                 │                  │
//!              └────────┬────────┘                  │
//!                       ▼                           │
//!               AnalysisResult ──▶ History Store ──▶ Trend Table
//!                                    (SQLite)       (JSON / CSV)
//! ```
//!
//! # Core Principle
//!
//! **The first mention wins.** Report order decides which value is kept
//! and in what order biomarkers are listed.
//!
//! # Modules
//!
//! - [`config`]: Extraction tuning knobs
//! - [`dictionary`]: Built-in known-biomarker table
//! - [`extract`]: Date extraction, candidate scanning, range enrichment
//! - [`resolver`]: Dictionary matching and cross-report normalization
//! - [`pipeline`]: One-call per-file analysis
//! - [`trend`]: Cross-report aggregation and export
//! - [`db`]: SQLite analysis history
//! - [`models`]: Domain types

pub mod config;
pub mod db;
pub mod dictionary;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod resolver;
pub mod trend;

// Re-export commonly used types
pub use config::{ConfigError, ExtractionConfig};
pub use db::Database;
pub use dictionary::BiomarkerDictionary;
pub use models::{
    AnalysisResult, BiomarkerDefinition, BiomarkerMap, BiomarkerObservation, DateSource, Flag,
    HistoryEntry, ReferenceRange,
};
pub use pipeline::ReportAnalyzer;
pub use resolver::{BiomarkerMatcher, Normalizer, SimilarityMatcher, SubstringMatcher};
pub use trend::{TrendBuilder, TrendTable};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

static DEFAULT_ANALYZER: Lazy<ReportAnalyzer> = Lazy::new(ReportAnalyzer::default);

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum LabTrendError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for LabTrendError {
    fn from(e: db::DbError) -> Self {
        LabTrendError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for LabTrendError {
    fn from(e: serde_json::Error) -> Self {
        LabTrendError::SerializationError(e.to_string())
    }
}

impl From<ConfigError> for LabTrendError {
    fn from(e: ConfigError) -> Self {
        LabTrendError::InvalidInput(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for LabTrendError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        LabTrendError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Stateless Functions (exported to FFI)
// =========================================================================

/// Analyze one report given its decoded page texts.
#[uniffi::export]
pub fn analyze_report(file_name: String, pages: Vec<String>) -> FfiAnalysisResult {
    DEFAULT_ANALYZER.analyze_pages(&file_name, &pages).into()
}

/// Analyze one report and return the result in its JSON wire form.
#[uniffi::export]
pub fn analyze_report_json(file_name: String, pages: Vec<String>) -> Result<String, LabTrendError> {
    let result = DEFAULT_ANALYZER.analyze_pages(&file_name, &pages);
    Ok(serde_json::to_string(&result)?)
}

/// The built-in biomarker dictionary.
#[uniffi::export]
pub fn known_biomarkers() -> Vec<FfiBiomarkerDefinition> {
    BiomarkerDictionary::builtin()
        .iter()
        .cloned()
        .map(Into::into)
        .collect()
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a history store at the given path.
#[uniffi::export]
pub fn open_history_store(
    path: String,
    config_json: Option<String>,
) -> Result<Arc<LabTrendStore>, LabTrendError> {
    let db = Database::open(&path)?;
    LabTrendStore::build(db, config_json)
}

/// Create an in-memory history store (for testing).
#[uniffi::export]
pub fn open_history_store_in_memory() -> Result<Arc<LabTrendStore>, LabTrendError> {
    let db = Database::open_in_memory()?;
    LabTrendStore::build(db, None)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe analyzer plus history database for FFI.
#[derive(uniffi::Object)]
pub struct LabTrendStore {
    db: Arc<Mutex<Database>>,
    analyzer: ReportAnalyzer,
}

impl LabTrendStore {
    fn build(db: Database, config_json: Option<String>) -> Result<Arc<Self>, LabTrendError> {
        let config = match config_json {
            Some(raw) => ExtractionConfig::from_json_str(&raw)?,
            None => ExtractionConfig::default(),
        };
        Ok(Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            analyzer: ReportAnalyzer::new(config),
        }))
    }

    fn trend_table(&self) -> Result<TrendTable, LabTrendError> {
        let db = self.db.lock()?;
        let history = db.list_history()?;
        let builder = TrendBuilder::new(self.analyzer.dictionary(), self.analyzer.matcher());
        Ok(builder.build(&history))
    }
}

#[uniffi::export]
impl LabTrendStore {
    // =========================================================================
    // Analysis
    // =========================================================================

    /// Analyze a report and append it to the history (unless it failed).
    pub fn analyze_and_record(
        &self,
        file_name: String,
        pages: Vec<String>,
    ) -> Result<FfiAnalysisResult, LabTrendError> {
        let result = self.analyzer.analyze_pages(&file_name, &pages);
        let db = self.db.lock()?;
        db.append_result(&result)?;
        Ok(result.into())
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Number of stored results.
    pub fn history_count(&self) -> Result<u32, LabTrendError> {
        let db = self.db.lock()?;
        Ok(db.count_history()? as u32)
    }

    /// Remove all stored results.
    pub fn clear_history(&self) -> Result<u32, LabTrendError> {
        let db = self.db.lock()?;
        Ok(db.clear_history()? as u32)
    }

    // =========================================================================
    // Trend Export
    // =========================================================================

    /// Trend table over the whole history as JSON.
    pub fn trend_table_json(&self) -> Result<String, LabTrendError> {
        Ok(self.trend_table()?.to_json()?)
    }

    /// Trend table over the whole history as CSV.
    pub fn trend_table_csv(&self) -> Result<String, LabTrendError> {
        Ok(self.trend_table()?.to_csv())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe biomarker observation with its name.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBiomarker {
    pub name: String,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub range_min: Option<f64>,
    pub range_max: Option<f64>,
    pub order_index: Option<u32>,
    pub flag: Option<String>,
}

impl From<(&str, &BiomarkerObservation)> for FfiBiomarker {
    fn from((name, obs): (&str, &BiomarkerObservation)) -> Self {
        Self {
            name: name.to_string(),
            value: obs.value,
            unit: obs.unit.clone(),
            range_min: obs.reference_range.map(|r| r.min),
            range_max: obs.reference_range.map(|r| r.max),
            order_index: obs.order_index.map(|i| i as u32),
            flag: obs.flag.map(|f| f.as_str().to_string()),
        }
    }
}

/// FFI-safe analysis result. Biomarkers are listed in insertion order.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAnalysisResult {
    pub file_name: String,
    pub test_date: String,
    pub date_source: String,
    pub biomarkers: Vec<FfiBiomarker>,
    pub original_order: Vec<String>,
    pub error: Option<String>,
}

impl From<AnalysisResult> for FfiAnalysisResult {
    fn from(result: AnalysisResult) -> Self {
        Self {
            biomarkers: result.biomarkers.iter().map(FfiBiomarker::from).collect(),
            date_source: result.date_source.as_str().to_string(),
            file_name: result.file_name,
            test_date: result.test_date,
            original_order: result.original_order,
            error: result.error,
        }
    }
}

/// FFI-safe dictionary entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBiomarkerDefinition {
    pub name: String,
    pub unit: String,
    pub range_min: f64,
    pub range_max: f64,
}

impl From<BiomarkerDefinition> for FfiBiomarkerDefinition {
    fn from(definition: BiomarkerDefinition) -> Self {
        Self {
            name: definition.name,
            unit: definition.unit,
            range_min: definition.range.min,
            range_max: definition.range.max,
        }
    }
}
