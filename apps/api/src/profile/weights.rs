use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::profile::strategies::{
    ArrayPresence, CompletionStrategy, FlatFields, NestedWeighted, SubField, SubFieldRule,
};

const EXPECTED_TOTAL: f64 = 100.0;

#[derive(Debug, Error, PartialEq)]
pub enum WeightConfigError {
    #[error("section weights sum to {0}, expected 100")]
    BadTotal(f64),

    #[error("weight for '{0}' is negative")]
    Negative(String),

    #[error("section '{0}' is configured more than once")]
    Duplicate(String),
}

/// How much each profile section contributes to the completion percentage.
/// Sections are processed, and gaps reported, in list order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SectionWeightConfig {
    pub resume_weight: f64,
    /// When false, zero-weight sections and sub-fields never show up in
    /// the missing-details list.
    #[serde(default)]
    pub report_zero_weight: bool,
    pub sections: Vec<SectionWeight>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionWeight {
    pub key: String,
    pub weight: f64,
    pub rule: SectionRule,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionRule {
    Fields(FlatFields),
    Array,
    Nested(NestedWeighted),
}

impl SectionRule {
    pub fn strategy(&self) -> &dyn CompletionStrategy {
        match self {
            SectionRule::Fields(flat) => flat,
            SectionRule::Array => &ArrayPresence,
            SectionRule::Nested(nested) => nested,
        }
    }
}

impl SectionWeight {
    pub fn new(key: &str, weight: f64, rule: SectionRule) -> Self {
        Self {
            key: key.to_string(),
            weight,
            rule,
        }
    }
}

impl Default for SectionWeightConfig {
    fn default() -> Self {
        let school = FlatFields::of(["schoolName", "board", "percentage", "passingYear"]);

        Self {
            resume_weight: 10.0,
            report_zero_weight: false,
            sections: vec![
                SectionWeight::new(
                    "careerPreferences",
                    15.0,
                    SectionRule::Fields(FlatFields::of([
                        "preferredJobType",
                        "preferredLocation",
                        "availabilityToWork",
                    ])),
                ),
                SectionWeight::new("profileSummary", 15.0, SectionRule::Fields(FlatFields::default())),
                SectionWeight::new("keySkills", 15.0, SectionRule::Fields(FlatFields::default())),
                SectionWeight::new("internships", 10.0, SectionRule::Array),
                SectionWeight::new("projects", 15.0, SectionRule::Array),
                SectionWeight::new(
                    "education",
                    20.0,
                    SectionRule::Nested(NestedWeighted {
                        sub_fields: vec![
                            SubField {
                                key: "degrees".to_string(),
                                weight: 50.0,
                                rule: SubFieldRule::Array,
                            },
                            SubField {
                                key: "class12".to_string(),
                                weight: 25.0,
                                rule: SubFieldRule::Fields(school.clone()),
                            },
                            SubField {
                                key: "class10".to_string(),
                                weight: 25.0,
                                rule: SubFieldRule::Fields(school),
                            },
                        ],
                    }),
                ),
            ],
        }
    }
}

impl SectionWeightConfig {
    pub fn total_weight(&self) -> f64 {
        self.resume_weight + self.sections.iter().map(|s| s.weight).sum::<f64>()
    }

    /// Checks that weights are non-negative, keys unique, and the total is 100.
    pub fn validate(&self) -> Result<(), WeightConfigError> {
        if self.resume_weight < 0.0 {
            return Err(WeightConfigError::Negative("resume".to_string()));
        }

        let mut seen = HashSet::new();
        for section in &self.sections {
            if section.weight < 0.0 {
                return Err(WeightConfigError::Negative(section.key.clone()));
            }
            if !seen.insert(section.key.as_str()) {
                return Err(WeightConfigError::Duplicate(section.key.clone()));
            }
            if let SectionRule::Nested(nested) = &section.rule {
                if let Some(sub) = nested.sub_fields.iter().find(|s| s.weight < 0.0) {
                    return Err(WeightConfigError::Negative(format!(
                        "{}.{}",
                        section.key, sub.key
                    )));
                }
            }
        }

        let total = self.total_weight();
        if (total - EXPECTED_TOTAL).abs() > 1e-6 {
            return Err(WeightConfigError::BadTotal(total));
        }
        Ok(())
    }

    /// Loads and validates a JSON weight file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read weight config {}", path.display()))?;
        let config: SectionWeightConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid weight config JSON in {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid weight config in {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = SectionWeightConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.total_weight(), 100.0);
    }

    #[test]
    fn test_bad_total_rejected() {
        let mut config = SectionWeightConfig::default();
        config.resume_weight = 5.0;
        assert_eq!(config.validate(), Err(WeightConfigError::BadTotal(95.0)));
    }

    #[test]
    fn test_duplicate_section_rejected() {
        let mut config = SectionWeightConfig::default();
        config.resume_weight = 0.0;
        config.sections.push(SectionWeight::new("projects", 10.0, SectionRule::Array));
        assert_eq!(
            config.validate(),
            Err(WeightConfigError::Duplicate("projects".to_string()))
        );
    }

    #[test]
    fn test_negative_sub_weight_rejected() {
        let mut config = SectionWeightConfig::default();
        if let Some(SectionRule::Nested(nested)) =
            config.sections.last_mut().map(|s| &mut s.rule)
        {
            nested.sub_fields[0].weight = -1.0;
        }
        assert_eq!(
            config.validate(),
            Err(WeightConfigError::Negative("education.degrees".to_string()))
        );
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "resumeWeight": 5,
            "sections": [
                { "key": "keySkills", "weight": 15, "rule": { "kind": "fields", "fields": ["keySkills"] } },
                { "key": "projects", "weight": 80, "rule": { "kind": "array" } }
            ]
        }"#;
        let config: SectionWeightConfig = serde_json::from_str(json).unwrap();
        assert!(!config.report_zero_weight);
        assert_eq!(config.sections[1].rule, SectionRule::Array);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_from_file_rejects_invalid_total() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "resumeWeight": 5, "sections": [{{ "key": "keySkills", "weight": 15, "rule": {{ "kind": "fields" }} }}] }}"#
        )
        .unwrap();
        let err = SectionWeightConfig::from_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("sum to 20"));
    }

    #[test]
    fn test_from_file_round_trips_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&SectionWeightConfig::default()).unwrap();
        file.write_all(json.as_bytes()).unwrap();
        let loaded = SectionWeightConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, SectionWeightConfig::default());
    }
}
