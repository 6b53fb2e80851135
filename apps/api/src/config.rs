use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::ats::steps::STEPS;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    /// Full URL of the ATS analysis endpoint.
    pub analysis_api_url: String,
    /// Base URL of the profile service; `/profile` is appended.
    pub profile_api_url: String,
    pub upload_prefix: String,
    /// Section weights override. Built-in defaults are used when unset.
    pub profile_weights_path: Option<PathBuf>,
    pub session_ttl: Duration,
    pub short_circuit_step: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let short_circuit_step = parse_env("ATS_SHORT_CIRCUIT_STEP", 3usize)?;
        anyhow::ensure!(
            short_circuit_step < STEPS.len(),
            "ATS_SHORT_CIRCUIT_STEP must be below {}",
            STEPS.len()
        );

        Ok(Config {
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            s3_region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            analysis_api_url: require_env("ANALYSIS_API_URL")?,
            profile_api_url: require_env("PROFILE_API_URL")?,
            upload_prefix: std::env::var("UPLOAD_PREFIX")
                .unwrap_or_else(|_| "ats-resumes".to_string()),
            profile_weights_path: std::env::var("PROFILE_WEIGHTS_PATH").ok().map(PathBuf::from),
            session_ttl: Duration::from_secs(parse_env("SESSION_TTL_SECS", 1800u64)?),
            short_circuit_step,
            port: parse_env("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_default_and_invalid() {
        assert_eq!(parse_env("JOBBOARD_TEST_UNSET_VAR", 7u16).unwrap(), 7);

        std::env::set_var("JOBBOARD_TEST_BAD_PORT", "eighty");
        let err = parse_env("JOBBOARD_TEST_BAD_PORT", 8080u16).unwrap_err();
        assert!(err.to_string().contains("JOBBOARD_TEST_BAD_PORT"));

        std::env::set_var("JOBBOARD_TEST_TTL", " 60 ");
        assert_eq!(parse_env("JOBBOARD_TEST_TTL", 1800u64).unwrap(), 60);
    }
}
