use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::Value;

use crate::auth::BearerToken;
use crate::errors::AppError;
use crate::profile::completeness::{compute_completion, compute_completion_value, CompletionReport};
use crate::profile::models::ProfileRecord;
use crate::profile::weights::SectionWeightConfig;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProfileResponse {
    pub profile: ProfileRecord,
    pub completion: CompletionReport,
}

/// POST /api/v1/profile/completion
/// Scores the posted record as-is; unknown or mistyped sections score 0.
pub async fn handle_score_profile(
    State(state): State<AppState>,
    Json(record): Json<Value>,
) -> Json<CompletionReport> {
    Json(compute_completion_value(&record, &state.weights))
}

/// GET /api/v1/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = state.profile_backend.fetch(&token).await?;
    let completion = compute_completion(&profile, &state.weights);
    Ok(Json(ProfileResponse {
        profile,
        completion,
    }))
}

/// PUT /api/v1/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    token: BearerToken,
    Json(record): Json<ProfileRecord>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = state.profile_backend.update(&token, &record).await?;
    let completion = compute_completion(&profile, &state.weights);
    Ok(Json(ProfileResponse {
        profile,
        completion,
    }))
}

/// GET /api/v1/profile/weights
pub async fn handle_get_weights(State(state): State<AppState>) -> Json<SectionWeightConfig> {
    Json(state.weights.as_ref().clone())
}
