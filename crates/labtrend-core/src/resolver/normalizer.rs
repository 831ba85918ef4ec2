//! Cross-report name and unit normalizer.
//!
//! Handles:
//! - Alias expansion (HbA1c→Hemoglobin A1c, SGPT→ALT)
//! - Dictionary matching to canonical names
//! - Unit spelling (mg/dl→mg/dL, K/uL→10^3/uL)
//!
//! Only the trend layer uses this. Report-level mappings keep raw names.

use std::collections::HashMap;

use super::BiomarkerMatcher;
use crate::dictionary::BiomarkerDictionary;
use crate::extract::clean_name;

/// Normalizer for biomarker names and units.
pub struct Normalizer {
    /// Alias map: lowercase printed name → canonical name
    aliases: HashMap<String, String>,
    /// Unit spellings: lowercase → canonical
    units: HashMap<String, String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// Create a new normalizer with default mappings.
    pub fn new() -> Self {
        Self {
            aliases: Self::default_aliases(),
            units: Self::default_units(),
        }
    }

    /// Canonical display name: alias table, then the dictionary, then the
    /// whitespace-collapsed original.
    pub fn canonical_name(
        &self,
        name: &str,
        dictionary: &BiomarkerDictionary,
        matcher: &dyn BiomarkerMatcher,
    ) -> String {
        let cleaned = clean_name(name);
        if let Some(canonical) = self.expand_alias(&cleaned) {
            return canonical;
        }
        match matcher.find(dictionary, &cleaned) {
            Some(definition) => definition.name.clone(),
            None => cleaned,
        }
    }

    /// Look up an alias (case-insensitive).
    pub fn expand_alias(&self, name: &str) -> Option<String> {
        self.aliases.get(&name.trim().to_lowercase()).cloned()
    }

    /// Canonical unit spelling; unknown units pass through trimmed.
    pub fn canonical_unit(&self, unit: &str) -> String {
        let trimmed = unit.trim();
        self.units
            .get(&trimmed.to_lowercase())
            .cloned()
            .unwrap_or_else(|| trimmed.to_string())
    }

    /// Add a custom alias mapping.
    pub fn add_alias(&mut self, alias: &str, canonical: &str) {
        self.aliases
            .insert(alias.trim().to_lowercase(), canonical.to_string());
    }

    /// Add a custom unit spelling.
    pub fn add_unit(&mut self, spelling: &str, canonical: &str) {
        self.units
            .insert(spelling.trim().to_lowercase(), canonical.to_string());
    }

    /// Default alias mappings.
    fn default_aliases() -> HashMap<String, String> {
        let mut map = HashMap::new();

        // Blood counts
        map.insert("hba1c".into(), "Hemoglobin A1c".into());
        map.insert("a1c".into(), "Hemoglobin A1c".into());
        map.insert("glycated hemoglobin".into(), "Hemoglobin A1c".into());
        map.insert("glycohemoglobin".into(), "Hemoglobin A1c".into());
        map.insert("hgb".into(), "Hemoglobin".into());
        map.insert("hb".into(), "Hemoglobin".into());
        map.insert("hct".into(), "Hematocrit".into());
        map.insert("white blood cells".into(), "WBC".into());
        map.insert("white blood cell count".into(), "WBC".into());
        map.insert("leukocytes".into(), "WBC".into());
        map.insert("red blood cells".into(), "RBC".into());
        map.insert("red blood cell count".into(), "RBC".into());
        map.insert("erythrocytes".into(), "RBC".into());
        map.insert("plt".into(), "Platelets".into());
        map.insert("platelet count".into(), "Platelets".into());

        // Lipids
        map.insert("cholesterol, total".into(), "Total Cholesterol".into());
        map.insert("ldl".into(), "LDL Cholesterol".into());
        map.insert("ldl-c".into(), "LDL Cholesterol".into());
        map.insert("ldl calc".into(), "LDL Cholesterol".into());
        map.insert("ldl chol calc".into(), "LDL Cholesterol".into());
        map.insert("hdl".into(), "HDL Cholesterol".into());
        map.insert("hdl-c".into(), "HDL Cholesterol".into());
        map.insert("vldl".into(), "VLDL Cholesterol".into());
        map.insert("tg".into(), "Triglycerides".into());
        map.insert("trigs".into(), "Triglycerides".into());

        // Metabolic
        map.insert("glucose, fasting".into(), "Glucose".into());
        map.insert("blood urea nitrogen".into(), "BUN".into());
        map.insert("urea nitrogen".into(), "BUN".into());
        map.insert("gfr".into(), "eGFR".into());
        map.insert("estimated gfr".into(), "eGFR".into());
        map.insert("na".into(), "Sodium".into());
        map.insert("k".into(), "Potassium".into());
        map.insert("cl".into(), "Chloride".into());
        map.insert("bicarbonate".into(), "CO2".into());
        map.insert("carbon dioxide".into(), "CO2".into());

        // Liver
        map.insert("sgpt".into(), "ALT".into());
        map.insert("alanine aminotransferase".into(), "ALT".into());
        map.insert("sgot".into(), "AST".into());
        map.insert("aspartate aminotransferase".into(), "AST".into());
        map.insert("alk phos".into(), "Alkaline Phosphatase".into());
        map.insert("alp".into(), "Alkaline Phosphatase".into());
        map.insert("gamma gt".into(), "GGT".into());
        map.insert("bilirubin, total".into(), "Total Bilirubin".into());

        // Vitamins and iron studies
        map.insert("25-oh vitamin d".into(), "Vitamin D".into());
        map.insert("vitamin d, 25-hydroxy".into(), "Vitamin D".into());
        map.insert("vitamin d3".into(), "Vitamin D".into());
        map.insert("b12".into(), "Vitamin B12".into());
        map.insert("cobalamin".into(), "Vitamin B12".into());
        map.insert("folic acid".into(), "Folate".into());
        map.insert("total iron binding capacity".into(), "TIBC".into());
        map.insert("iron binding capacity".into(), "TIBC".into());

        // Hormones
        map.insert("thyroid stimulating hormone".into(), "TSH".into());
        map.insert("ft4".into(), "Free T4".into());
        map.insert("free thyroxine".into(), "Free T4".into());
        map.insert("ft3".into(), "Free T3".into());

        // Inflammation and markers
        map.insert("c-reactive protein".into(), "CRP".into());
        map.insert("hs-crp".into(), "CRP".into());
        map.insert("hscrp".into(), "CRP".into());
        map.insert("sed rate".into(), "ESR".into());
        map.insert("prostate specific antigen".into(), "PSA".into());

        map
    }

    /// Default unit spellings.
    fn default_units() -> HashMap<String, String> {
        let mut map = HashMap::new();

        // Mass concentration
        map.insert("mg/dl".into(), "mg/dL".into());
        map.insert("g/dl".into(), "g/dL".into());
        map.insert("ug/dl".into(), "ug/dL".into());
        map.insert("mcg/dl".into(), "ug/dL".into());
        map.insert("µg/dl".into(), "ug/dL".into());
        map.insert("ng/ml".into(), "ng/mL".into());
        map.insert("ng/dl".into(), "ng/dL".into());
        map.insert("pg/ml".into(), "pg/mL".into());
        map.insert("mg/l".into(), "mg/L".into());

        // Molar and activity
        map.insert("mmol/l".into(), "mmol/L".into());
        map.insert("meq/l".into(), "mEq/L".into());
        map.insert("u/l".into(), "U/L".into());
        map.insert("iu/l".into(), "U/L".into());
        map.insert("u/ml".into(), "U/mL".into());
        map.insert("miu/l".into(), "mIU/L".into());
        map.insert("uiu/ml".into(), "uIU/mL".into());
        map.insert("µiu/ml".into(), "uIU/mL".into());

        // Counts
        map.insert("10^3/ul".into(), "10^3/uL".into());
        map.insert("x10^3/ul".into(), "10^3/uL".into());
        map.insert("k/ul".into(), "10^3/uL".into());
        map.insert("thou/ul".into(), "10^3/uL".into());
        map.insert("10^6/ul".into(), "10^6/uL".into());
        map.insert("x10^6/ul".into(), "10^6/uL".into());
        map.insert("m/ul".into(), "10^6/uL".into());
        map.insert("mil/ul".into(), "10^6/uL".into());
        map.insert("fl".into(), "fL".into());

        // Other
        map.insert("ml/min/1.73m2".into(), "mL/min/1.73m2".into());
        map.insert("mm/hr".into(), "mm/hr".into());

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{SimilarityMatcher, SubstringMatcher};

    fn canonical(name: &str) -> String {
        Normalizer::new().canonical_name(name, BiomarkerDictionary::builtin(), &SubstringMatcher)
    }

    #[test]
    fn test_alias_expansion() {
        assert_eq!(canonical("HbA1c"), "Hemoglobin A1c");
        assert_eq!(canonical("SGPT"), "ALT");
        assert_eq!(canonical("sgot"), "AST");
        assert_eq!(canonical("Total Iron Binding Capacity"), "TIBC");
    }

    #[test]
    fn test_dictionary_fallback() {
        assert_eq!(canonical("Fasting Glucose"), "Glucose");
        assert_eq!(canonical("glucose"), "Glucose");
        assert_eq!(canonical("Cholesterol"), "Total Cholesterol");
    }

    #[test]
    fn test_unknown_names_pass_through_cleaned() {
        assert_eq!(canonical("  Zinc   Level "), "Zinc Level");
    }

    #[test]
    fn test_matcher_is_pluggable() {
        let normalizer = Normalizer::new();
        let dictionary = BiomarkerDictionary::builtin();
        assert_eq!(
            normalizer.canonical_name("Trigylcerides", dictionary, &SimilarityMatcher::default()),
            "Triglycerides"
        );
    }

    #[test]
    fn test_unit_spelling() {
        let normalizer = Normalizer::new();
        assert_eq!(normalizer.canonical_unit("mg/dl"), "mg/dL");
        assert_eq!(normalizer.canonical_unit("MG/DL"), "mg/dL");
        assert_eq!(normalizer.canonical_unit("K/uL"), "10^3/uL");
        assert_eq!(normalizer.canonical_unit(" widgets "), "widgets");
    }

    #[test]
    fn test_custom_mappings() {
        let mut normalizer = Normalizer::new();
        normalizer.add_alias("Zn", "Zinc");
        normalizer.add_unit("mcmol/l", "umol/L");

        assert_eq!(normalizer.expand_alias("ZN"), Some("Zinc".into()));
        assert_eq!(normalizer.canonical_unit("mcmol/L"), "umol/L");
    }
}
