//! Page-text sources.
//!
//! The analyzer only ever sees decoded page strings. Everything that turns a
//! file into those strings lives behind [`PageSource`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Page break in plain-text exports.
const FORM_FEED: char = '\u{0C}';

/// Source errors.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF decode error: {0}")]
    Pdf(String),

    #[error("Unsupported file type: {0}")]
    Unsupported(String),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Something that can produce the decoded page texts of one report.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Name reported in the analysis result.
    fn file_name(&self) -> &str;

    /// Decoded page texts in page order.
    async fn pages(&self) -> SourceResult<Vec<String>>;
}

/// Pages already in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InMemorySource {
    pub file_name: String,
    pub pages: Vec<String>,
}

impl InMemorySource {
    pub fn new(file_name: impl Into<String>, pages: Vec<String>) -> Self {
        Self {
            file_name: file_name.into(),
            pages,
        }
    }
}

#[async_trait]
impl PageSource for InMemorySource {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    async fn pages(&self) -> SourceResult<Vec<String>> {
        Ok(self.pages.clone())
    }
}

/// Parse a JSON page bundle: either one `{fileName, pages}` document or an
/// array of them.
pub fn parse_bundle(raw: &str) -> SourceResult<Vec<InMemorySource>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Bundle {
        Many(Vec<InMemorySource>),
        One(InMemorySource),
    }

    Ok(match serde_json::from_str(raw)? {
        Bundle::Many(documents) => documents,
        Bundle::One(document) => vec![document],
    })
}

/// Read and parse a JSON page bundle file.
pub async fn read_bundle(path: &Path) -> SourceResult<Vec<InMemorySource>> {
    let raw = tokio::fs::read_to_string(path).await?;
    parse_bundle(&raw)
}

/// UTF-8 text file; form feeds separate pages.
#[derive(Debug, Clone)]
pub struct TextFileSource {
    path: PathBuf,
    file_name: String,
}

impl TextFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = display_name(&path);
        Self { path, file_name }
    }
}

#[async_trait]
impl PageSource for TextFileSource {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    async fn pages(&self) -> SourceResult<Vec<String>> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        Ok(split_pages(&raw))
    }
}

/// Split on form feeds, dropping the empty tail after a final break.
pub fn split_pages(raw: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw.split(FORM_FEED).map(str::to_string).collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

/// PDF decoded with lopdf, one string per page.
#[cfg(feature = "pdf")]
#[derive(Debug, Clone)]
pub struct PdfSource {
    path: PathBuf,
    file_name: String,
}

#[cfg(feature = "pdf")]
impl PdfSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = display_name(&path);
        Self { path, file_name }
    }
}

#[cfg(feature = "pdf")]
#[async_trait]
impl PageSource for PdfSource {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    async fn pages(&self) -> SourceResult<Vec<String>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || decode_pdf(&path))
            .await
            .map_err(|e| SourceError::Pdf(e.to_string()))?
    }
}

#[cfg(feature = "pdf")]
fn decode_pdf(path: &Path) -> SourceResult<Vec<String>> {
    let document = lopdf::Document::load(path).map_err(|e| SourceError::Pdf(e.to_string()))?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().keys() {
        let text = document
            .extract_text(&[*page_number])
            .map_err(|e| SourceError::Pdf(format!("page {}: {}", page_number, e)))?;
        pages.push(text);
    }
    debug!(path = %path.display(), pages = pages.len(), "decoded pdf");
    Ok(pages)
}

/// A file that could not be opened as a source. Its pages are always an
/// error, so it still yields one failed result in its input slot.
#[derive(Debug, Clone)]
pub struct UnreadableSource {
    file_name: String,
    reason: String,
}

impl UnreadableSource {
    pub fn new(file_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl PageSource for UnreadableSource {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    async fn pages(&self) -> SourceResult<Vec<String>> {
        Err(SourceError::Unsupported(self.reason.clone()))
    }
}

/// Pick a source by file extension.
pub fn source_for_path(path: &Path) -> Box<dyn PageSource> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "txt" | "text" => Box::new(TextFileSource::new(path)),
        #[cfg(feature = "pdf")]
        "pdf" => Box::new(PdfSource::new(path)),
        #[cfg(not(feature = "pdf"))]
        "pdf" => Box::new(UnreadableSource::new(
            display_name(path),
            "pdf (built without the `pdf` feature)",
        )),
        other => Box::new(UnreadableSource::new(display_name(path), other.to_string())),
    }
}

/// Sources for a list of paths in input order. JSON bundles expand in place
/// into their documents.
pub async fn open_sources(paths: &[PathBuf]) -> Vec<Box<dyn PageSource>> {
    let mut sources: Vec<Box<dyn PageSource>> = Vec::with_capacity(paths.len());

    for path in paths {
        let is_bundle = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        if !is_bundle {
            sources.push(source_for_path(path));
            continue;
        }

        match read_bundle(path).await {
            Ok(documents) => {
                debug!(path = %path.display(), documents = documents.len(), "read page bundle");
                for document in documents {
                    sources.push(Box::new(document));
                }
            }
            Err(e) => sources.push(Box::new(UnreadableSource::new(
                display_name(path),
                format!("bundle: {}", e),
            ))),
        }
    }

    sources
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
