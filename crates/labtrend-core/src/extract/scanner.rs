//! Regex candidate scanner.
//!
//! Each [`MatchStrategy`] is one independent pass over the whole text. Hits
//! that read the same value token are one mention; the highest-precedence
//! pass keeps it and lower ones only fill in fields it lacks.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Captures, Match, Regex};
use tracing::{debug, trace};

use super::filters::{is_date_like, is_section_header, CandidateFilter};
use crate::config::ExtractionConfig;
use crate::dictionary::BiomarkerDictionary;
use crate::models::{CandidateMatch, Flag, MatchStrategy, ReferenceRange};
use crate::resolver::BiomarkerMatcher;

/// Biomarker name: words of letters, digits and light punctuation. Words
/// after the first start with a letter, `(` or a `25-` style prefix so a
/// bare number never joins the name.
pub(super) const NAME: &str = r"[A-Za-z][A-Za-z0-9\-/(),.'+]*(?:[ \t]+(?:[A-Za-z(]|\d+-)[A-Za-z0-9\-/(),.'+]*)*";

const VALUE: &str = r"-?\d+(?:,\d{3})*(?:\.\d+)?";

/// Unit, optionally with a `10^3/` style multiplier prefix.
const UNIT: &str = r"(?:[x×]?10[\^*Ee]\d+/?)?[A-Za-zµμ%][A-Za-z0-9µμ%/.]*";

/// `:` or plain whitespace between name and value.
const SEP: &str = r"(?:[ \t]*:[ \t]*|[ \t]+)";

const RANGE_NUM: &str = r"\d+(?:\.\d+)?";

static PASSES: Lazy<Vec<(MatchStrategy, Regex)>> = Lazy::new(|| {
    MatchStrategy::ALL
        .iter()
        .map(|&strategy| {
            let pattern = match strategy {
                MatchStrategy::InlineRange => format!(
                    r"\b(?P<name>{NAME}){SEP}(?P<value>{VALUE})(?:[ \t]*(?P<unit>{UNIT}))?[ \t]+\(?[ \t]*(?P<min>{RANGE_NUM})[ \t]*[-–][ \t]*(?P<max>{RANGE_NUM})[ \t]*\)?"
                ),
                MatchStrategy::Flagged => format!(
                    r"(?m)^[ \t]*(?P<name>{NAME}){SEP}(?P<value>{VALUE})(?:[ \t]*(?P<unit>{UNIT}))?(?:[ \t]+\(?[ \t]*(?P<min>{RANGE_NUM})[ \t]*[-–][ \t]*(?P<max>{RANGE_NUM})[ \t]*\)?)?[ \t]+(?P<flag>HIGH|LOW|High|Low|H|L)\b"
                ),
                MatchStrategy::Colon => format!(
                    r"\b(?P<name>{NAME})[ \t]*:[ \t]*(?P<value>{VALUE})(?:[ \t]*(?P<unit>{UNIT}))?"
                ),
                MatchStrategy::Tabular => format!(
                    r"(?m)^[ \t]*(?P<name>{NAME})[ \t]+(?P<value>{VALUE})[ \t]*(?P<unit>{UNIT})"
                ),
                MatchStrategy::MultilineName => format!(
                    r"(?m)^[ \t]*(?P<name>{NAME})[ \t]*\r?\n[ \t]*(?:(?P<name2>{NAME})[ \t]+)?(?P<value>{VALUE})(?:[ \t]*(?P<unit>{UNIT}))?[ \t]*\r?$"
                ),
            };
            (strategy, Regex::new(&pattern).unwrap())
        })
        .collect()
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").unwrap());

/// `1e5`, `2.5E+3`: exponent notation the value pattern only half reads.
static EXPONENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[eE][+-]?\d").unwrap());

/// Runs every pass, filters the hits and merges duplicates.
pub struct CandidateScanner<'a> {
    filter: CandidateFilter<'a>,
}

impl<'a> CandidateScanner<'a> {
    pub fn new(
        config: &'a ExtractionConfig,
        dictionary: &'a BiomarkerDictionary,
        matcher: &'a dyn BiomarkerMatcher,
    ) -> Self {
        Self {
            filter: CandidateFilter::new(config, dictionary, matcher),
        }
    }

    /// All accepted candidates, ascending by name offset.
    pub fn scan(&self, text: &str) -> Vec<CandidateMatch> {
        // value offset -> merged candidate; passes run in precedence order
        let mut mentions: BTreeMap<usize, CandidateMatch> = BTreeMap::new();

        for (strategy, regex) in PASSES.iter() {
            let mut accepted = 0usize;
            for caps in regex.captures_iter(text) {
                let Some((value_offset, candidate)) = self.accept(text, *strategy, &caps) else {
                    continue;
                };
                accepted += 1;
                mentions
                    .entry(value_offset)
                    .and_modify(|existing| existing.absorb(&candidate))
                    .or_insert(candidate);
            }
            trace!(strategy = strategy.as_str(), accepted, "scanner pass");
        }

        let mut candidates: Vec<CandidateMatch> = mentions.into_values().collect();
        candidates.sort_by_key(|c| c.offset);
        debug!(count = candidates.len(), "candidates after merge");
        candidates
    }

    /// Turn one regex hit into a candidate, or reject it.
    fn accept(
        &self,
        text: &str,
        strategy: MatchStrategy,
        caps: &Captures<'_>,
    ) -> Option<(usize, CandidateMatch)> {
        let name_match = caps.name("name")?;
        let value_match = caps.name("value")?;

        if strategy == MatchStrategy::MultilineName && is_section_header(name_match.as_str()) {
            return None;
        }

        let (name, offset) =
            self.plausible_name(text, name_match, caps.name("name2").map(|m| m.as_str()))?;

        if is_date_like(&text[value_match.start()..]) || EXPONENT.is_match(&text[value_match.end()..]) {
            return None;
        }
        let value = parse_number(value_match.as_str())?;
        if !self.filter.is_plausible_value(value) {
            return None;
        }

        let mut unit = caps.name("unit").and_then(|u| clean_unit(u.as_str()));
        let mut flag = caps.name("flag").and_then(|f| Flag::parse(f.as_str()));
        // a lone H/L where a unit would be is the flag column
        if flag.is_none() {
            if let Some(as_flag) = unit.as_deref().and_then(bare_flag) {
                flag = Some(as_flag);
                unit = None;
            }
        }

        let reference_range = match (caps.name("min"), caps.name("max")) {
            (Some(min), Some(max)) => {
                ReferenceRange::new(parse_number(min.as_str())?, parse_number(max.as_str())?)
            }
            _ => None,
        };

        Some((
            value_match.start(),
            CandidateMatch {
                name,
                value,
                unit,
                reference_range,
                flag,
                offset,
                strategy,
            },
        ))
    }

    /// Longest plausible name inside the captured span, dropping leading
    /// words one at a time. A word right after a number on the same line is
    /// the previous result's unit and never starts a name.
    fn plausible_name(&self, text: &str, name: Match<'_>, tail: Option<&str>) -> Option<(String, usize)> {
        for word in WORD.find_iter(name.as_str()) {
            let start = name.start() + word.start();
            if follows_number(text, start) {
                continue;
            }
            let head = &text[start..name.end()];
            let candidate = match tail {
                Some(tail) => clean_name(&format!("{} {}", head, tail)),
                None => clean_name(head),
            };
            if self.filter.is_plausible_name(&candidate) {
                return Some((candidate, start));
            }
            trace!(name = %candidate, "implausible name");
        }
        None
    }
}

/// Whether the token before `start` on the same line is a number.
fn follows_number(text: &str, start: usize) -> bool {
    let before = text[..start].trim_end_matches([' ', '\t']);
    if before.len() == start {
        return false;
    }
    let token = before.rsplit(char::is_whitespace).next().unwrap_or_default();
    token.chars().any(|c| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
}

/// Collapse whitespace and drop trailing punctuation left by the name pattern.
pub fn clean_name(raw: &str) -> String {
    let collapsed = WHITESPACE.replace_all(raw.trim(), " ");
    collapsed
        .trim_end_matches(|c: char| matches!(c, ',' | '.' | '(' | '-' | '/') || c.is_whitespace())
        .to_string()
}

/// Parse a printed number, ignoring thousands separators.
fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Trim trailing dots and drop words that are clearly not units.
fn clean_unit(raw: &str) -> Option<String> {
    let unit = raw.trim_end_matches('.');
    if unit.is_empty() {
        return None;
    }
    let plain_word = unit.chars().all(|c| c.is_ascii_alphabetic());
    if plain_word && unit.len() > 5 {
        return None;
    }
    Some(unit.to_string())
}

fn bare_flag(unit: &str) -> Option<Flag> {
    match unit {
        "H" | "HIGH" | "High" => Some(Flag::High),
        "LOW" | "Low" => Some(Flag::Low),
        _ => None,
    }
}
