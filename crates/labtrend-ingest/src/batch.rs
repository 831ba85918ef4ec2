//! Concurrent per-file analysis.
//!
//! One task per file. A task awaits its page text, then runs the synchronous
//! pipeline on the blocking pool. A semaphore bounds how many files are in
//! flight; results come back in input order.

use std::sync::Arc;

use chrono::Utc;
use labtrend_core::{AnalysisResult, ReportAnalyzer};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::source::PageSource;

/// Environment variable overriding [`BatchConfig::max_concurrent_files`].
pub const MAX_CONCURRENCY_ENV: &str = "LABTREND_MAX_CONCURRENCY";

const DEFAULT_MAX_CONCURRENT_FILES: usize = 8;

/// Batch tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Files decoded and analyzed at the same time
    pub max_concurrent_files: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_files: DEFAULT_MAX_CONCURRENT_FILES,
        }
    }
}

impl BatchConfig {
    /// Defaults, with `LABTREND_MAX_CONCURRENCY` applied when set.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_files: parse_concurrency(std::env::var(MAX_CONCURRENCY_ENV).ok()),
        }
    }
}

fn parse_concurrency(raw: Option<String>) -> usize {
    let Some(raw) = raw else {
        return DEFAULT_MAX_CONCURRENT_FILES;
    };
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => {
            warn!(value = %raw, "ignoring invalid {}", MAX_CONCURRENCY_ENV);
            DEFAULT_MAX_CONCURRENT_FILES
        }
    }
}

/// Wire form of a batch: `{"results": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchReport {
    pub results: Vec<AnalysisResult>,
}

/// Analyze every source concurrently. Always returns one result per source,
/// in input order; a failed file never affects its siblings.
pub async fn analyze_sources(
    analyzer: Arc<ReportAnalyzer>,
    sources: Vec<Box<dyn PageSource>>,
    config: BatchConfig,
) -> Vec<AnalysisResult> {
    let file_names: Vec<String> = sources.iter().map(|s| s.file_name().to_string()).collect();
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_files.max(1)));
    let mut tasks = JoinSet::new();

    for (index, source) in sources.into_iter().enumerate() {
        let analyzer = Arc::clone(&analyzer);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            // the semaphore is never closed
            let _permit = semaphore.acquire_owned().await.ok();
            (index, analyze_source(analyzer, source).await)
        });
    }

    let mut slots: Vec<Option<AnalysisResult>> = vec![None; file_names.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => warn!(error = %e, "analysis task aborted"),
        }
    }

    let results: Vec<AnalysisResult> = slots
        .into_iter()
        .zip(file_names)
        .map(|(slot, file_name)| {
            slot.unwrap_or_else(|| {
                AnalysisResult::failed(file_name, "analysis task aborted", Utc::now())
            })
        })
        .collect();

    let failed = results.iter().filter(|r| r.is_error()).count();
    info!(files = results.len(), failed, "batch analyzed");
    results
}

/// Decode one source and run the pipeline on it.
async fn analyze_source(analyzer: Arc<ReportAnalyzer>, source: Box<dyn PageSource>) -> AnalysisResult {
    let file_name = source.file_name().to_string();

    let pages = match source.pages().await {
        Ok(pages) => pages,
        Err(e) => {
            warn!(file = %file_name, error = %e, "failed to decode pages");
            return AnalysisResult::failed(file_name, e.to_string(), Utc::now());
        }
    };

    let name = file_name.clone();
    match tokio::task::spawn_blocking(move || analyzer.analyze_pages(&name, &pages)).await {
        Ok(result) => result,
        Err(e) => {
            warn!(file = %file_name, error = %e, "analysis panicked");
            AnalysisResult::failed(file_name, format!("analysis failed: {}", e), Utc::now())
        }
    }
}
