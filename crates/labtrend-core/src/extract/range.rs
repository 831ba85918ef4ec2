//! Reference range lookup around a candidate and the whole-text backfill sweep.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use super::scanner::{clean_name, NAME};
use crate::config::ExtractionConfig;
use crate::models::{BiomarkerMap, ReferenceRange};

/// Bound with an optional comparison operator, e.g. `<5.0`.
const NUM: &str = r"[<>]?\s*\d+(?:\.\d+)?";

/// Context patterns in precedence order.
static CONTEXT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        format!(r"(?i)reference\s+range\s*:?\s*(?P<min>{NUM})\s*[-–]\s*(?P<max>{NUM})"),
        format!(r"(?i)normal\s+range\s*:?\s*(?P<min>{NUM})\s*[-–]\s*(?P<max>{NUM})"),
        format!(r"\(\s*(?P<min>{NUM})\s*[-–]\s*(?P<max>{NUM})\s*\)"),
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// `Name: reference/normal/range X - Y` anywhere in the text.
static BACKFILL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<name>{NAME})[ \t]*:[ \t]*(?:reference|normal|range)[^0-9\n]*?(?P<min>{NUM})[ \t]*[-–][ \t]*(?P<max>{NUM})"
    ))
    .unwrap()
});

/// Finds printed reference ranges near candidates.
#[derive(Debug, Clone, Copy)]
pub struct RangeEnricher {
    before: usize,
    after: usize,
}

impl RangeEnricher {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            before: config.context_before,
            after: config.context_after,
        }
    }

    /// First valid range in the window around `offset`, trying the patterns
    /// in precedence order.
    pub fn find_in_context(&self, text: &str, offset: usize) -> Option<ReferenceRange> {
        let window = context_window(text, offset, self.before, self.after);
        CONTEXT_PATTERNS.iter().find_map(|pattern| {
            pattern
                .captures_iter(window)
                .find_map(|caps| range_from_captures(&caps))
        })
    }

    /// Fill missing ranges of already-accepted biomarkers from
    /// `Name: reference range X - Y` lines. Returns how many were filled.
    pub fn backfill(&self, text: &str, biomarkers: &mut BiomarkerMap) -> usize {
        let mut filled = 0;
        for caps in BACKFILL_PATTERN.captures_iter(text) {
            let Some(name) = caps.name("name").map(|m| clean_name(m.as_str())) else {
                continue;
            };
            let Some(range) = range_from_captures(&caps) else {
                continue;
            };
            if let Some(observation) = biomarkers.get_mut(&name) {
                if observation.reference_range.is_none() {
                    observation.reference_range = Some(range);
                    filled += 1;
                    debug!(name = %name, min = range.min, max = range.max, "range backfilled");
                }
            }
        }
        filled
    }
}

/// Slice of `text` from `before` bytes ahead of `offset` to `after` bytes
/// past it, shrunk to char boundaries.
fn context_window(text: &str, offset: usize, before: usize, after: usize) -> &str {
    let mut start = offset.saturating_sub(before).min(text.len());
    while !text.is_char_boundary(start) {
        start += 1;
    }
    let mut end = offset.saturating_add(after).min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    if start >= end {
        return "";
    }
    &text[start..end]
}

fn range_from_captures(caps: &Captures<'_>) -> Option<ReferenceRange> {
    let min = parse_bound(caps.name("min")?.as_str())?;
    let max = parse_bound(caps.name("max")?.as_str())?;
    ReferenceRange::new(min, max)
}

fn parse_bound(raw: &str) -> Option<f64> {
    raw.trim_start_matches(['<', '>'])
        .trim()
        .parse::<f64>()
        .ok()
}
