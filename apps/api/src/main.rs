mod ats;
mod auth;
mod config;
mod errors;
mod profile;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ats::analysis::HttpAnalysisBackend;
use crate::ats::steps::Pacing;
use crate::ats::store::S3DocumentStore;
use crate::ats::{SessionDeps, SessionRegistry};
use crate::config::Config;
use crate::profile::backend::HttpProfileBackend;
use crate::profile::SectionWeightConfig;
use crate::routes::build_router;
use crate::state::AppState;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jobboard API v{}", env!("CARGO_PKG_VERSION"));

    // Section weights
    let weights = match &config.profile_weights_path {
        Some(path) => SectionWeightConfig::from_file(path)?,
        None => SectionWeightConfig::default(),
    };
    info!(
        "Profile weights loaded: {} sections, resume weight {}",
        weights.sections.len(),
        weights.resume_weight
    );

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;

    let deps = SessionDeps {
        store: Arc::new(S3DocumentStore::new(s3, &config.s3_bucket)),
        analysis: Arc::new(HttpAnalysisBackend::new(
            http.clone(),
            &config.analysis_api_url,
        )),
        destination: config.upload_prefix.clone(),
        pacing: Pacing::default().with_short_circuit_step(config.short_circuit_step),
    };

    let state = AppState {
        weights: Arc::new(weights),
        profile_backend: Arc::new(HttpProfileBackend::new(http, &config.profile_api_url)),
        sessions: SessionRegistry::new(deps, config.session_ttl),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "jobboard-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets by path, not virtual host
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
