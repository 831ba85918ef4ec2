//! Extraction tuning knobs.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Parameters for the extraction pipeline. Every field has a default, so a
/// config file only needs the keys it overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Largest accepted measurement value
    pub max_value: f64,
    /// Shortest accepted biomarker name, in characters
    pub min_name_len: usize,
    /// Longest accepted biomarker name, in characters
    pub max_name_len: usize,
    /// Bytes searched before a candidate for a reference range
    pub context_before: usize,
    /// Bytes searched after a candidate for a reference range
    pub context_after: usize,
    /// Date reported when no date pattern matches
    pub fallback_date: NaiveDate,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_value: 100_000.0,
            min_name_len: 3,
            max_name_len: 60,
            context_before: 100,
            context_after: 200,
            fallback_date: NaiveDate::from_ymd_opt(2023, 6, 15).unwrap_or(NaiveDate::MIN),
        }
    }
}

impl ExtractionConfig {
    /// Load and validate a JSON config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Parse and validate a JSON config document.
    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.max_value.is_finite() || self.max_value <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_value must be a positive number, got {}",
                self.max_value
            )));
        }
        if self.min_name_len == 0 || self.min_name_len > self.max_name_len {
            return Err(ConfigError::Invalid(format!(
                "name length bounds {}..={} are empty",
                self.min_name_len, self.max_name_len
            )));
        }
        Ok(())
    }
}
