use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierError;

/// Approximate macro-nutrients for a representative serving of a food.
///
/// These are illustrative values for the dish in general, not measurements of
/// the photographed portion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutrientFacts {
    #[serde(rename = "Calories")]
    pub calories: String,
    #[serde(rename = "Protein")]
    pub protein: String,
    #[serde(rename = "Carbs")]
    pub carbs: String,
    #[serde(rename = "Fats")]
    pub fats: String,
}

impl NutrientFacts {
    pub fn new(
        calories: impl Into<String>,
        protein: impl Into<String>,
        carbs: impl Into<String>,
        fats: impl Into<String>,
    ) -> Self {
        Self {
            calories: calories.into(),
            protein: protein.into(),
            carbs: carbs.into(),
            fats: fats.into(),
        }
    }

    /// Record returned for labels with no entry of their own.
    pub fn fallback() -> Self {
        Self::new("300 kcal", "10 g", "40 g", "12 g")
    }
}

/// On-disk layout of a nutrient table.
#[derive(Debug, Deserialize)]
struct NutrientTableFile {
    #[serde(default)]
    default: Option<NutrientFacts>,
    #[serde(default)]
    foods: HashMap<String, NutrientFacts>,
    /// Drop the built-in entries instead of extending them.
    #[serde(default)]
    replace: bool,
}

/// Total mapping from food label to nutrient facts.
#[derive(Debug, Clone, PartialEq)]
pub struct NutrientTable {
    entries: HashMap<String, NutrientFacts>,
    default: NutrientFacts,
}

impl Default for NutrientTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl NutrientTable {
    /// The built-in sample table.
    pub fn builtin() -> Self {
        let entries = [
            ("pizza", NutrientFacts::new("266 kcal", "11 g", "33 g", "10 g")),
            ("samosa", NutrientFacts::new("262 kcal", "6 g", "30 g", "15 g")),
            ("ice_cream", NutrientFacts::new("207 kcal", "3.5 g", "24 g", "11 g")),
            ("butter_chicken", NutrientFacts::new("438 kcal", "30 g", "15 g", "30 g")),
        ];
        Self {
            entries: entries
                .into_iter()
                .map(|(label, facts)| (label.to_string(), facts))
                .collect(),
            default: NutrientFacts::fallback(),
        }
    }

    /// An empty table that answers every lookup with `default`.
    pub fn with_default(default: NutrientFacts) -> Self {
        Self {
            entries: HashMap::new(),
            default,
        }
    }

    /// Loads a JSON table. Entries extend the built-in table unless the file
    /// sets `"replace": true`.
    ///
    /// ```json
    /// {
    ///   "default": {"Calories": "300 kcal", "Protein": "10 g", "Carbs": "40 g", "Fats": "12 g"},
    ///   "foods": {"sushi": {"Calories": "150 kcal", "Protein": "6 g", "Carbs": "30 g", "Fats": "1 g"}}
    /// }
    /// ```
    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        let file: NutrientTableFile = serde_json::from_str(json).map_err(|e| {
            ClassifierError::ValidationError(format!("Invalid nutrient table: {}", e))
        })?;

        let mut table = if file.replace {
            Self::with_default(NutrientFacts::fallback())
        } else {
            Self::builtin()
        };
        if let Some(default) = file.default {
            table.default = default;
        }
        for (label, facts) in file.foods {
            table.insert(label, facts);
        }
        Ok(table)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            ClassifierError::ValidationError(format!(
                "Failed to read nutrient table {}: {}",
                path.display(),
                e
            ))
        })?;
        let table = Self::from_json(&json)?;
        log::info!("Loaded nutrient table with {} entries from {:?}", table.len(), path);
        Ok(table)
    }

    pub fn insert(&mut self, label: impl Into<String>, facts: NutrientFacts) {
        self.entries.insert(label.into(), facts);
    }

    /// Exact-match lookup, falling back to the default record.
    pub fn lookup(&self, label: &str) -> &NutrientFacts {
        self.entries.get(label).unwrap_or(&self.default)
    }

    /// Whether `label` has its own entry rather than the default.
    pub fn has_entry(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    pub fn default_facts(&self) -> &NutrientFacts {
        &self.default
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LabelVocabulary;

    #[test]
    fn test_known_label() {
        let table = NutrientTable::builtin();
        assert_eq!(
            table.lookup("pizza"),
            &NutrientFacts::new("266 kcal", "11 g", "33 g", "10 g")
        );
        assert_eq!(table.lookup("ice_cream").protein, "3.5 g");
        assert!(table.has_entry("butter_chicken"));
    }

    #[test]
    fn test_unlisted_label_uses_default() {
        let table = NutrientTable::builtin();
        assert_eq!(
            table.lookup("waffles"),
            &NutrientFacts::new("300 kcal", "10 g", "40 g", "12 g")
        );
        assert_eq!(table.lookup(""), table.default_facts());
        assert_eq!(table.lookup("Pizza"), table.default_facts());
        assert!(!table.has_entry("waffles"));
    }

    #[test]
    fn test_lookup_total_over_vocabulary() {
        let table = NutrientTable::builtin();
        for label in LabelVocabulary::food101().iter() {
            let facts = table.lookup(label);
            assert!(!facts.calories.is_empty());
            assert!(!facts.protein.is_empty());
            assert!(!facts.carbs.is_empty());
            assert!(!facts.fats.is_empty());
        }
    }

    #[test]
    fn test_serialized_keys() {
        let json = serde_json::to_value(NutrientFacts::fallback()).unwrap();
        assert_eq!(json["Calories"], "300 kcal");
        assert_eq!(json["Protein"], "10 g");
        assert_eq!(json["Carbs"], "40 g");
        assert_eq!(json["Fats"], "12 g");
    }

    #[test]
    fn test_json_extends_builtin() {
        let table = NutrientTable::from_json(
            r#"{"foods": {"sushi": {"Calories": "150 kcal", "Protein": "6 g", "Carbs": "30 g", "Fats": "1 g"}}}"#,
        )
        .unwrap();
        assert_eq!(table.lookup("sushi").calories, "150 kcal");
        assert!(table.has_entry("sushi"));
        assert_eq!(table.lookup("pizza").calories, "266 kcal");
        assert_eq!(table.lookup("waffles"), &NutrientFacts::fallback());
    }

    #[test]
    fn test_json_replace_and_default() {
        let table = NutrientTable::from_json(
            r#"{"replace": true, "default": {"Calories": "1 kcal", "Protein": "1 g", "Carbs": "1 g", "Fats": "1 g"}}"#,
        )
        .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.lookup("pizza").calories, "1 kcal");
    }

    #[test]
    fn test_invalid_json() {
        let err = NutrientTable::from_json("{\"foods\": 3}").unwrap_err();
        assert!(matches!(err, ClassifierError::ValidationError(_)));
    }
}
