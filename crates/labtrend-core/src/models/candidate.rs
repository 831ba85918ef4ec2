//! Candidate biomarker mentions produced by the scanner.

use serde::{Deserialize, Serialize};

use super::{Flag, ReferenceRange};

/// Regex pass that produced a candidate. Declaration order is merge
/// precedence: when two passes hit the same mention, the earlier one wins
/// and later ones only fill in missing fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// `Name Value Unit min - max`
    InlineRange,
    /// `Name Value Unit [min - max] H`
    Flagged,
    /// `Name: Value Unit`
    Colon,
    /// `Name Value Unit` at the start of a line
    Tabular,
    /// Name wrapped over two lines, value on the second
    MultilineName,
}

impl MatchStrategy {
    /// All strategies in precedence order.
    pub const ALL: [MatchStrategy; 5] = [
        MatchStrategy::InlineRange,
        MatchStrategy::Flagged,
        MatchStrategy::Colon,
        MatchStrategy::Tabular,
        MatchStrategy::MultilineName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::InlineRange => "inline_range",
            MatchStrategy::Flagged => "flagged",
            MatchStrategy::Colon => "colon",
            MatchStrategy::Tabular => "tabular",
            MatchStrategy::MultilineName => "multiline_name",
        }
    }
}

/// A biomarker mention found in report text. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateMatch {
    /// Name as found in the text, whitespace-collapsed
    pub name: String,
    /// Parsed value
    pub value: f64,
    /// Unit printed after the value
    pub unit: Option<String>,
    /// Range printed on the same line, if the pass captured one
    pub reference_range: Option<ReferenceRange>,
    /// H/L flag, if the pass captured one
    pub flag: Option<Flag>,
    /// Byte offset of the name in the report text
    pub offset: usize,
    /// Pass that produced this candidate
    pub strategy: MatchStrategy,
}

impl CandidateMatch {
    /// Fill empty fields from a duplicate hit of the same mention.
    pub fn absorb(&mut self, other: &CandidateMatch) {
        if self.unit.is_none() {
            self.unit = other.unit.clone();
        }
        if self.reference_range.is_none() {
            self.reference_range = other.reference_range;
        }
        if self.flag.is_none() {
            self.flag = other.flag;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_order_is_precedence() {
        let mut sorted = MatchStrategy::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, MatchStrategy::ALL.to_vec());
        assert!(MatchStrategy::InlineRange < MatchStrategy::Tabular);
    }

    #[test]
    fn test_absorb_fills_only_missing() {
        let mut primary = CandidateMatch {
            name: "Glucose".into(),
            value: 85.0,
            unit: Some("mg/dL".into()),
            reference_range: None,
            flag: None,
            offset: 0,
            strategy: MatchStrategy::Colon,
        };
        let other = CandidateMatch {
            unit: Some("mmol/L".into()),
            reference_range: ReferenceRange::new(70.0, 100.0),
            flag: Some(Flag::High),
            strategy: MatchStrategy::Tabular,
            ..primary.clone()
        };

        primary.absorb(&other);

        assert_eq!(primary.unit.as_deref(), Some("mg/dL"));
        assert_eq!(primary.reference_range, ReferenceRange::new(70.0, 100.0));
        assert_eq!(primary.flag, Some(Flag::High));
    }
}
