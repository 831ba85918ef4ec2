use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use labtrend_core::models::HistoryEntry;
use labtrend_core::{AnalysisResult, Database, ExtractionConfig, ReportAnalyzer, TrendBuilder};
use labtrend_ingest::{analyze_sources, open_sources, BatchConfig, BatchReport};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "labtrend")]
#[command(about = "Extract biomarkers from lab reports and track them over time")]
struct Cli {
    /// Extraction config (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite history database; results are appended to it
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze reports and print the results as JSON
    Analyze {
        /// Report files (.txt, .json page bundles, .pdf with the `pdf` feature)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Analyze reports and print the biomarker trend table
    Trends {
        /// Report files; may be empty when --history is given
        files: Vec<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = TrendFormat::Json)]
        format: TrendFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TrendFormat {
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the JSON/CSV output, logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ExtractionConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ExtractionConfig::default(),
    };
    let analyzer = Arc::new(ReportAnalyzer::new(config));
    let history = cli
        .history
        .as_deref()
        .map(open_history)
        .transpose()?;

    match cli.command {
        Commands::Analyze { files } => {
            let results = run_batch(&analyzer, &files).await;
            record(history.as_ref(), &results)?;
            println!("{}", serde_json::to_string_pretty(&BatchReport { results })?);
        }
        Commands::Trends { files, format } => {
            if files.is_empty() && history.is_none() {
                anyhow::bail!("nothing to aggregate: pass report files or --history");
            }
            let results = run_batch(&analyzer, &files).await;
            record(history.as_ref(), &results)?;

            let entries: Vec<HistoryEntry> = match &history {
                Some(db) => db.list_history()?,
                None => results
                    .iter()
                    .filter_map(AnalysisResult::to_history_entry)
                    .collect(),
            };
            let table = TrendBuilder::new(analyzer.dictionary(), analyzer.matcher()).build(&entries);

            match format {
                TrendFormat::Json => println!("{}", table.to_json()?),
                TrendFormat::Csv => print!("{}", table.to_csv()),
            }
        }
    }

    Ok(())
}

async fn run_batch(analyzer: &Arc<ReportAnalyzer>, files: &[PathBuf]) -> Vec<AnalysisResult> {
    if files.is_empty() {
        return Vec::new();
    }
    let sources = open_sources(files).await;
    analyze_sources(Arc::clone(analyzer), sources, BatchConfig::from_env()).await
}

fn open_history(path: &Path) -> anyhow::Result<Database> {
    Database::open(path).with_context(|| format!("opening history {}", path.display()))
}

fn record(history: Option<&Database>, results: &[AnalysisResult]) -> anyhow::Result<()> {
    let Some(db) = history else {
        return Ok(());
    };
    let mut stored = 0;
    for result in results {
        if db.append_result(result)? {
            stored += 1;
        }
    }
    info!(stored, skipped = results.len() - stored, "history updated");
    Ok(())
}
