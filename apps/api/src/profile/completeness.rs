use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::profile::models::ProfileRecord;
use crate::profile::strategies::{humanize, is_filled};
use crate::profile::weights::SectionWeightConfig;

/// The "missing details" panel only has room for this many lines.
pub const MAX_MISSING_DETAILS: usize = 11;

const RESUME_FIELD: &str = "resumeUrl";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SectionProgress {
    pub section: String,
    pub weight: f64,
    pub ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    /// 0 – 100
    pub percentage: u8,
    pub missing_details: Vec<String>,
    pub sections: Vec<SectionProgress>,
}

pub fn compute_completion(record: &ProfileRecord, config: &SectionWeightConfig) -> CompletionReport {
    compute_completion_value(&record.to_value(), config)
}

/// Scores an arbitrary JSON record. Absent or mistyped sections simply score 0.
pub fn compute_completion_value(record: &Value, config: &SectionWeightConfig) -> CompletionReport {
    let mut completed_weight = 0.0;
    let mut total_weight = 0.0;
    let mut missing = Vec::new();
    let mut sections = Vec::with_capacity(config.sections.len() + 1);

    let resume_weight = config.resume_weight.max(0.0);
    let has_resume = record.get(RESUME_FIELD).map(is_filled).unwrap_or(false);
    if has_resume {
        completed_weight += resume_weight;
    } else if resume_weight > 0.0 || config.report_zero_weight {
        missing.push("Add resume".to_string());
    }
    total_weight += resume_weight;
    sections.push(SectionProgress {
        section: "resume".to_string(),
        weight: resume_weight,
        ratio: if has_resume { 1.0 } else { 0.0 },
    });

    for section in &config.sections {
        let weight = section.weight.max(0.0);
        let eval = section
            .rule
            .strategy()
            .evaluate(&section.key, record.get(section.key.as_str()));
        let ratio = eval.ratio.clamp(0.0, 1.0);

        let reportable = weight > 0.0 || config.report_zero_weight;
        for gap in eval.gaps {
            if reportable && (!gap.zero_weight || config.report_zero_weight) {
                missing.push(format!("Add {}", humanize(&gap.key)));
            }
        }

        completed_weight += weight * ratio;
        total_weight += weight;
        sections.push(SectionProgress {
            section: section.key.clone(),
            weight,
            ratio,
        });
    }

    let percentage = if total_weight > 0.0 {
        (100.0 * completed_weight / total_weight).round().clamp(0.0, 100.0) as u8
    } else {
        0
    };

    missing.truncate(MAX_MISSING_DETAILS);

    CompletionReport {
        percentage,
        missing_details: missing,
        sections,
    }
}
