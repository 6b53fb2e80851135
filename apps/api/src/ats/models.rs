use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A file picked by the user, held in memory until the upload finishes.
#[derive(Clone, PartialEq)]
pub struct PendingFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl PendingFile {
    pub fn new(file_name: &str, content_type: Option<&str>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: content_type.map(String::from),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for PendingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// One scored category of the ATS report (e.g. "Formatting", "Keywords").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryScore {
    #[serde(rename = "Score")]
    pub score: f64,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Recommendations", default)]
    pub recommendations: Vec<String>,
}

/// Score record produced by the analysis backend. Category keys vary, so
/// everything beyond the two fixed fields is kept as raw JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AtsReport {
    #[serde(rename = "ATS_Score")]
    pub ats_score: f64,
    #[serde(rename = "Overall_Recommendations", default)]
    pub overall_recommendations: Vec<String>,
    #[serde(flatten)]
    pub sections: BTreeMap<String, Value>,
}

impl AtsReport {
    /// Entries of `sections` that have the `{ Score, Description, Recommendations }` shape.
    pub fn categories(&self) -> Vec<(&str, CategoryScore)> {
        self.sections
            .iter()
            .filter_map(|(name, value)| {
                serde_json::from_value::<CategoryScore>(value.clone())
                    .ok()
                    .map(|c| (name.as_str(), c))
            })
            .collect()
    }
}
