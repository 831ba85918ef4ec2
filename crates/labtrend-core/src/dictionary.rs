//! Built-in dictionary of known biomarkers.
//!
//! Entry order matters: substring matching picks the first entry that
//! contains (or is contained in) a candidate name, so more specific names
//! come before the generic ones they overlap with, and short abbreviations
//! that occur inside ordinary words sit at the end.

use once_cell::sync::Lazy;

use crate::models::{BiomarkerDefinition, ReferenceRange};

/// (name, unit, min, max)
const BUILTIN: &[(&str, &str, f64, f64)] = &[
    // Blood counts
    ("Hemoglobin A1c", "%", 4.0, 5.6),
    ("Hemoglobin", "g/dL", 12.0, 17.5),
    ("Hematocrit", "%", 36.0, 50.0),
    ("WBC", "10^3/uL", 4.5, 11.0),
    ("RBC", "10^6/uL", 4.2, 5.9),
    ("Platelets", "10^3/uL", 150.0, 450.0),
    ("MCV", "fL", 80.0, 100.0),
    ("MCHC", "g/dL", 32.0, 36.0),
    ("MCH", "pg", 27.0, 33.0),
    ("RDW", "%", 11.5, 14.5),
    ("Neutrophils", "%", 40.0, 70.0),
    ("Lymphocytes", "%", 20.0, 40.0),
    ("Monocytes", "%", 2.0, 8.0),
    ("Eosinophils", "%", 1.0, 4.0),
    ("Basophils", "%", 0.0, 1.0),
    // Lipids
    ("Total Cholesterol", "mg/dL", 125.0, 200.0),
    ("HDL Cholesterol", "mg/dL", 40.0, 60.0),
    ("LDL Cholesterol", "mg/dL", 0.0, 100.0),
    ("VLDL Cholesterol", "mg/dL", 5.0, 40.0),
    ("Triglycerides", "mg/dL", 0.0, 150.0),
    // Metabolic
    ("Glucose", "mg/dL", 70.0, 100.0),
    ("Insulin", "uIU/mL", 2.6, 24.9),
    ("BUN", "mg/dL", 7.0, 20.0),
    ("Creatinine", "mg/dL", 0.6, 1.2),
    ("eGFR", "mL/min/1.73m2", 90.0, 120.0),
    ("Sodium", "mmol/L", 135.0, 145.0),
    ("Potassium", "mmol/L", 3.5, 5.0),
    ("Chloride", "mmol/L", 98.0, 106.0),
    ("CO2", "mmol/L", 23.0, 29.0),
    ("Calcium", "mg/dL", 8.5, 10.5),
    ("Magnesium", "mg/dL", 1.7, 2.2),
    ("Phosphorus", "mg/dL", 2.5, 4.5),
    ("Uric Acid", "mg/dL", 3.5, 7.2),
    // Liver panel
    ("Total Protein", "g/dL", 6.0, 8.3),
    ("Albumin", "g/dL", 3.5, 5.0),
    ("Total Bilirubin", "mg/dL", 0.1, 1.2),
    ("Alkaline Phosphatase", "U/L", 44.0, 147.0),
    ("GGT", "U/L", 9.0, 48.0),
    // Vitamins and minerals
    ("Vitamin D", "ng/mL", 30.0, 100.0),
    ("Vitamin B12", "pg/mL", 200.0, 900.0),
    ("Folate", "ng/mL", 2.7, 17.0),
    ("Ferritin", "ng/mL", 20.0, 250.0),
    ("TIBC", "ug/dL", 250.0, 450.0),
    ("Iron", "ug/dL", 60.0, 170.0),
    // Hormones
    ("TSH", "mIU/L", 0.4, 4.0),
    ("Free T4", "ng/dL", 0.8, 1.8),
    ("Free T3", "pg/mL", 2.3, 4.2),
    ("Testosterone", "ng/dL", 300.0, 1000.0),
    ("Estradiol", "pg/mL", 15.0, 350.0),
    ("Cortisol", "ug/dL", 6.0, 23.0),
    // Inflammation
    ("CRP", "mg/L", 0.0, 3.0),
    ("ESR", "mm/hr", 0.0, 20.0),
    // Cancer markers
    ("PSA", "ng/mL", 0.0, 4.0),
    ("CEA", "ng/mL", 0.0, 3.0),
    ("CA-125", "U/mL", 0.0, 35.0),
    ("AFP", "ng/mL", 0.0, 10.0),
    // Short liver enzymes last: "ast" occurs inside "fasting", "breast", ...
    ("ALT", "U/L", 7.0, 56.0),
    ("AST", "U/L", 10.0, 40.0),
];

static BUILTIN_DICTIONARY: Lazy<BiomarkerDictionary> = Lazy::new(|| {
    BiomarkerDictionary::from_definitions(
        BUILTIN
            .iter()
            .filter_map(|&(name, unit, min, max)| {
                Some(BiomarkerDefinition {
                    name: name.to_string(),
                    unit: unit.to_string(),
                    range: ReferenceRange::new(min, max)?,
                })
            })
            .collect(),
    )
});

/// Immutable table of known biomarkers.
#[derive(Debug, Clone, PartialEq)]
pub struct BiomarkerDictionary {
    definitions: Vec<BiomarkerDefinition>,
    /// Lowercased names, index-aligned with `definitions`
    lowered: Vec<String>,
}

impl BiomarkerDictionary {
    /// The process-wide built-in dictionary.
    pub fn builtin() -> &'static BiomarkerDictionary {
        &BUILTIN_DICTIONARY
    }

    /// Build a dictionary from explicit definitions. Later duplicates of a
    /// name (case-insensitive) are dropped.
    pub fn from_definitions(definitions: Vec<BiomarkerDefinition>) -> Self {
        let mut kept: Vec<BiomarkerDefinition> = Vec::with_capacity(definitions.len());
        let mut lowered: Vec<String> = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let lower = definition.name.to_lowercase();
            if lowered.contains(&lower) {
                continue;
            }
            lowered.push(lower);
            kept.push(definition);
        }
        Self {
            definitions: kept,
            lowered,
        }
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BiomarkerDefinition> {
        self.definitions.iter()
    }

    /// Entries paired with their lowercased names, in dictionary order.
    pub fn iter_lowered(&self) -> impl Iterator<Item = (&str, &BiomarkerDefinition)> {
        self.lowered
            .iter()
            .map(String::as_str)
            .zip(self.definitions.iter())
    }

    /// Look up an entry by canonical name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&BiomarkerDefinition> {
        let lower = name.trim().to_lowercase();
        self.iter_lowered()
            .find(|(entry, _)| *entry == lower)
            .map(|(_, definition)| definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_size_and_ranges() {
        let dictionary = BiomarkerDictionary::builtin();

        // every table row survives range validation
        assert_eq!(dictionary.len(), BUILTIN.len());
        assert!(dictionary.len() >= 50);
        for definition in dictionary.iter() {
            assert!(definition.range.min < definition.range.max, "{}", definition.name);
            assert!(!definition.unit.is_empty());
        }
    }

    #[test]
    fn test_names_unique() {
        let dictionary = BiomarkerDictionary::builtin();
        let mut names: Vec<String> = dictionary.iter().map(|d| d.name.to_lowercase()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), dictionary.len());
    }

    #[test]
    fn test_get_case_insensitive() {
        let dictionary = BiomarkerDictionary::builtin();
        let glucose = dictionary.get("glucose").unwrap();
        assert_eq!(glucose.name, "Glucose");
        assert_eq!(glucose.unit, "mg/dL");
        assert_eq!(glucose.range, ReferenceRange::new(70.0, 100.0).unwrap());
        assert!(dictionary.get("Unobtainium").is_none());
    }

    #[test]
    fn test_from_definitions_drops_duplicates() {
        let def = |name: &str| BiomarkerDefinition {
            name: name.into(),
            unit: "mg/dL".into(),
            range: ReferenceRange::new(1.0, 2.0).unwrap(),
        };
        let dictionary = BiomarkerDictionary::from_definitions(vec![def("Zinc"), def("ZINC")]);
        assert_eq!(dictionary.len(), 1);
    }
}
