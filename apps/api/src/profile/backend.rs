//! Client for the profile backend (`GET`/`PUT /profile`).

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::BearerToken;
use crate::profile::models::ProfileRecord;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Profile API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Profile API rejected the token")]
    Unauthorized,
}

#[async_trait]
pub trait ProfileBackend: Send + Sync {
    async fn fetch(&self, token: &BearerToken) -> Result<ProfileRecord, ProfileError>;

    async fn update(
        &self,
        token: &BearerToken,
        record: &ProfileRecord,
    ) -> Result<ProfileRecord, ProfileError>;
}

/// Some deployments wrap the record as `{ "profile": {...} }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileEnvelope {
    Wrapped { profile: ProfileRecord },
    Bare(ProfileRecord),
}

impl ProfileEnvelope {
    fn into_record(self) -> ProfileRecord {
        match self {
            ProfileEnvelope::Wrapped { profile } => profile,
            ProfileEnvelope::Bare(profile) => profile,
        }
    }
}

#[derive(Clone)]
pub struct HttpProfileBackend {
    client: Client,
    base_url: String,
}

impl HttpProfileBackend {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self) -> String {
        format!("{}/profile", self.base_url)
    }
}

#[async_trait]
impl ProfileBackend for HttpProfileBackend {
    async fn fetch(&self, token: &BearerToken) -> Result<ProfileRecord, ProfileError> {
        let response = self
            .client
            .get(self.url())
            .bearer_auth(&token.0)
            .send()
            .await?;
        let record = read_profile(response).await?;
        debug!("Fetched profile from backend");
        Ok(record)
    }

    async fn update(
        &self,
        token: &BearerToken,
        record: &ProfileRecord,
    ) -> Result<ProfileRecord, ProfileError> {
        let response = self
            .client
            .put(self.url())
            .bearer_auth(&token.0)
            .json(record)
            .send()
            .await?;
        let record = read_profile(response).await?;
        debug!("Updated profile on backend");
        Ok(record)
    }
}

async fn read_profile(response: Response) -> Result<ProfileRecord, ProfileError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        warn!("Profile backend returned {status}");
        return Err(ProfileError::Unauthorized);
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ProfileError::Api {
            status: status.as_u16(),
            message,
        });
    }
    let envelope: ProfileEnvelope = response.json().await?;
    Ok(envelope.into_record())
}
