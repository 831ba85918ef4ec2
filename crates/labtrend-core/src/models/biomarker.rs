//! Biomarker definitions, reference ranges and per-report observations.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A reference interval for a biomarker value. `min < max` always holds for
/// ranges built through [`ReferenceRange::new`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReferenceRange {
    pub min: f64,
    pub max: f64,
}

impl ReferenceRange {
    /// Build a range, rejecting non-finite bounds and `min >= max`.
    pub fn new(min: f64, max: f64) -> Option<Self> {
        if min.is_finite() && max.is_finite() && min < max {
            Some(Self { min, max })
        } else {
            None
        }
    }

    /// Check whether a value lies inside the interval (inclusive).
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Classify a value against the interval.
    pub fn classify(&self, value: f64) -> RangeStatus {
        if value < self.min {
            RangeStatus::Below
        } else if value > self.max {
            RangeStatus::Above
        } else {
            RangeStatus::Within
        }
    }
}

/// Where a value sits relative to its reference range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RangeStatus {
    Below,
    Within,
    Above,
}

/// Abnormal flag printed next to a value in the report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Flag {
    #[serde(rename = "H")]
    High,
    #[serde(rename = "L")]
    Low,
}

impl Flag {
    /// Parse a printed flag (`H`, `HIGH`, `L`, `LOW`, any case).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "H" | "HIGH" => Some(Flag::High),
            "L" | "LOW" => Some(Flag::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::High => "H",
            Flag::Low => "L",
        }
    }
}

/// Static dictionary entry for a known biomarker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BiomarkerDefinition {
    /// Canonical name (unique key in the dictionary)
    pub name: String,
    /// Default unit (e.g., "mg/dL")
    pub unit: String,
    /// Default reference range
    pub range: ReferenceRange,
}

/// One biomarker value extracted from a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BiomarkerObservation {
    /// Measured value; `None` only on the error path
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_range: Option<ReferenceRange>,
    /// Position of first occurrence among accepted observations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<Flag>,
}

impl BiomarkerObservation {
    /// Range status of the value, when both value and range are known.
    pub fn status(&self) -> Option<RangeStatus> {
        match (self.value, self.reference_range) {
            (Some(value), Some(range)) => Some(range.classify(value)),
            _ => None,
        }
    }
}

/// Report-level mapping from display name to observation.
///
/// Keeps insertion order explicitly; the first insert of a name wins and
/// later inserts of the same name are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BiomarkerMap {
    entries: Vec<(String, BiomarkerObservation)>,
}

impl BiomarkerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    pub fn get(&self, name: &str) -> Option<&BiomarkerObservation> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, obs)| obs)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut BiomarkerObservation> {
        self.entries
            .iter_mut()
            .find(|(key, _)| key == name)
            .map(|(_, obs)| obs)
    }

    /// Insert an observation. Returns `false` (and drops the observation)
    /// when the name is already present.
    pub fn insert(&mut self, name: impl Into<String>, observation: BiomarkerObservation) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.entries.push((name, observation));
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BiomarkerObservation)> {
        self.entries.iter().map(|(key, obs)| (key.as_str(), obs))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut BiomarkerObservation)> {
        self.entries.iter_mut().map(|(key, obs)| (key.as_str(), obs))
    }

    /// Names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }
}

impl Serialize for BiomarkerMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, observation) in &self.entries {
            map.serialize_entry(name, observation)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for BiomarkerMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = BiomarkerMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of biomarker name to observation")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = BiomarkerMap::new();
                while let Some((name, observation)) =
                    access.next_entry::<String, BiomarkerObservation>()?
                {
                    map.insert(name, observation);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}
