//! Completion strategies: the three ways a profile section can be judged
//! "filled in". Each strategy sees only its own section value, so they can be
//! exercised without building a whole profile.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A gap found while evaluating a section, named by its raw (camelCase) key.
#[derive(Debug, Clone, PartialEq)]
pub struct Gap {
    pub key: String,
    /// Set when the gap belongs to a zero-weight sub-field.
    pub zero_weight: bool,
}

impl Gap {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            zero_weight: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// 0.0 – 1.0
    pub ratio: f64,
    pub gaps: Vec<Gap>,
}

pub trait CompletionStrategy {
    /// Evaluates the value stored under `key`. `value` is `None` when the
    /// section is absent from the record.
    fn evaluate(&self, key: &str, value: Option<&Value>) -> Evaluation;
}

/// Fraction of listed fields holding a non-empty value. An empty field list
/// means the section value itself is the single field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FlatFields {
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Binary: 1 when the array has at least one element with a non-empty value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArrayPresence;

/// Weighted average over named sub-fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NestedWeighted {
    pub sub_fields: Vec<SubField>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubField {
    pub key: String,
    pub weight: f64,
    pub rule: SubFieldRule,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubFieldRule {
    Fields(FlatFields),
    Array,
}

impl FlatFields {
    pub fn of<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl CompletionStrategy for FlatFields {
    fn evaluate(&self, key: &str, value: Option<&Value>) -> Evaluation {
        let own_key = [key.to_string()];
        let fields: &[String] = if self.fields.is_empty() {
            &own_key
        } else {
            &self.fields
        };

        let filled = fields
            .iter()
            .filter(|field| {
                let field_value = if field.as_str() == key {
                    value
                } else {
                    value.and_then(|v| v.get(field.as_str()))
                };
                field_value.map(is_filled).unwrap_or(false)
            })
            .count();

        let ratio = filled as f64 / fields.len() as f64;
        let gaps = if ratio < 1.0 {
            vec![Gap::new(key)]
        } else {
            vec![]
        };
        Evaluation { ratio, gaps }
    }
}

impl CompletionStrategy for ArrayPresence {
    fn evaluate(&self, key: &str, value: Option<&Value>) -> Evaluation {
        let present = value
            .and_then(Value::as_array)
            .map(|items| items.iter().any(element_has_content))
            .unwrap_or(false);

        if present {
            Evaluation {
                ratio: 1.0,
                gaps: vec![],
            }
        } else {
            Evaluation {
                ratio: 0.0,
                gaps: vec![Gap::new(key)],
            }
        }
    }
}

impl CompletionStrategy for NestedWeighted {
    fn evaluate(&self, _key: &str, value: Option<&Value>) -> Evaluation {
        let mut weighted = 0.0;
        let mut total = 0.0;
        let mut gaps = Vec::new();

        for sub in &self.sub_fields {
            let sub_value = value.and_then(|v| v.get(sub.key.as_str()));
            let eval = match &sub.rule {
                SubFieldRule::Fields(flat) => flat.evaluate(&sub.key, sub_value),
                SubFieldRule::Array => ArrayPresence.evaluate(&sub.key, sub_value),
            };
            let weight = sub.weight.max(0.0);
            weighted += weight * eval.ratio;
            total += weight;
            if eval.ratio < 1.0 {
                gaps.push(Gap {
                    key: sub.key.clone(),
                    zero_weight: weight == 0.0,
                });
            }
        }

        let ratio = if total > 0.0 {
            (weighted / total).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Evaluation { ratio, gaps }
    }
}

/// A value counts as filled when, after trimming, something is left.
pub fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(_) => true,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => items.iter().any(is_filled),
        Value::Object(map) => map.values().any(is_filled),
    }
}

/// Placeholder rows (`{ "company": "", "role": "" }`) do not count.
fn element_has_content(element: &Value) -> bool {
    match element {
        Value::Object(map) => map.values().any(is_filled),
        other => is_filled(other),
    }
}

/// `careerPreferences` -> `career preferences`, `class_12` -> `class 12`.
pub fn humanize(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if c == '_' || c == '-' {
            out.push(' ');
        } else if c.is_uppercase() {
            if i > 0 {
                out.push(' ');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
