use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::ats::machine::SessionSnapshot;
use crate::ats::models::PendingFile;
use crate::ats::steps::STEPS;
use crate::ats::validation::validate_pdf;
use crate::auth::BearerToken;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub session_id: Uuid,
    pub session: SessionSnapshot,
}

#[derive(Serialize)]
pub struct StepsResponse {
    pub steps: Vec<&'static str>,
}

/// GET /api/v1/ats/steps
pub async fn handle_get_steps() -> Json<StepsResponse> {
    Json(StepsResponse {
        steps: STEPS.to_vec(),
    })
}

/// POST /api/v1/ats/sessions
/// Rejects a bad file before any session exists.
pub async fn handle_create_session(
    State(state): State<AppState>,
    token: BearerToken,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SessionCreated>), AppError> {
    let file = read_file_field(multipart).await?;
    validate_pdf(file.as_ref())?;

    let (session_id, handle) = state.sessions.create().await;
    handle.submit(file, token).await?;
    let live = state.sessions.len().await;
    info!(%session_id, live, "ATS session started");

    Ok((
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id,
            session: handle.snapshot(),
        }),
    ))
}

/// POST /api/v1/ats/sessions/:id/submit
pub async fn handle_resubmit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    token: BearerToken,
    multipart: Multipart,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
    let file = read_file_field(multipart).await?;
    handle.submit(file, token).await?;
    Ok(Json(handle.snapshot()))
}

/// GET /api/v1/ats/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
    Ok(Json(handle.snapshot()))
}

/// DELETE /api/v1/ats/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let handle = state
        .sessions
        .remove(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
    handle.reset().await;
    Ok(StatusCode::NO_CONTENT)
}

/// Pulls the `file` part out of the form. A form without one yields `None`
/// so validation reports it the same way as an empty picker.
async fn read_file_field(mut multipart: Multipart) -> Result<Option<PendingFile>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(String::from);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        return Ok(Some(PendingFile::new(
            &file_name,
            content_type.as_deref(),
            bytes,
        )));
    }
    Ok(None)
}
