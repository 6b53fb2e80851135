//! Analysis client: posts the uploaded resume URL to the ATS scoring backend.
//!
//! The score itself is computed remotely; this module only moves the request
//! and turns the reply (or the failure) into something the session can show.
//! No retries: a failed analysis is reported and the user resubmits.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::ats::errors::AnalysisError;
use crate::ats::models::AtsReport;
use crate::auth::BearerToken;

#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn analyze(&self, document_url: &str, token: &BearerToken)
        -> Result<AtsReport, AnalysisError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisRequest<'a> {
    document_url: &'a str,
}

/// Error bodies seen from the backend: `{ "message" }`, `{ "error": "..." }`
/// or `{ "error": { "message" } }`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<Value>,
}

impl ErrorBody {
    fn message(self) -> Option<String> {
        self.message.or_else(|| match self.error? {
            Value::String(s) => Some(s),
            Value::Object(map) => map.get("message").and_then(Value::as_str).map(String::from),
            _ => None,
        })
    }
}

#[derive(Clone)]
pub struct HttpAnalysisBackend {
    client: Client,
    endpoint: String,
}

impl HttpAnalysisBackend {
    pub fn new(client: Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl AnalysisBackend for HttpAnalysisBackend {
    async fn analyze(
        &self,
        document_url: &str,
        token: &BearerToken,
    ) -> Result<AtsReport, AnalysisError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&token.0)
            .json(&AnalysisRequest { document_url })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Analysis API returned {}: {}", status, body);
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(ErrorBody::message)
                .unwrap_or(body);
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let report = parse_report(&body)?;
        debug!(
            "Analysis succeeded: score={}, categories={}",
            report.ats_score,
            report.categories().len()
        );
        Ok(report)
    }
}

/// Accepts the report bare or wrapped in `{ "data": ... }`.
fn parse_report(body: &str) -> Result<AtsReport, AnalysisError> {
    if body.trim().is_empty() {
        return Err(AnalysisError::Empty);
    }
    let value: Value = serde_json::from_str(body)?;
    let value = match value {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    match &value {
        Value::Null => return Err(AnalysisError::Empty),
        Value::Object(map) if map.is_empty() => return Err(AnalysisError::Empty),
        _ => {}
    }
    Ok(serde_json::from_value(value)?)
}
