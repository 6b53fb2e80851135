pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::ats::handlers as ats;
use crate::ats::validation::MAX_UPLOAD_BYTES;
use crate::profile::handlers as profile;
use crate::state::AppState;

/// Room for the multipart framing around a maximum-size resume.
const FORM_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Profile completeness
        .route(
            "/api/v1/profile",
            get(profile::handle_get_profile).put(profile::handle_update_profile),
        )
        .route(
            "/api/v1/profile/completion",
            post(profile::handle_score_profile),
        )
        .route("/api/v1/profile/weights", get(profile::handle_get_weights))
        // ATS checker
        .route("/api/v1/ats/steps", get(ats::handle_get_steps))
        .route("/api/v1/ats/sessions", post(ats::handle_create_session))
        .route(
            "/api/v1/ats/sessions/:id",
            get(ats::handle_get_session).delete(ats::handle_delete_session),
        )
        .route(
            "/api/v1/ats/sessions/:id/submit",
            post(ats::handle_resubmit),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + FORM_OVERHEAD))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::ats::analysis::AnalysisBackend;
    use crate::ats::errors::{AnalysisError, UploadError};
    use crate::ats::models::{AtsReport, PendingFile};
    use crate::ats::steps::Pacing;
    use crate::ats::store::{DocumentStore, UploadProgress};
    use crate::ats::{SessionDeps, SessionRegistry};
    use crate::auth::BearerToken;
    use crate::profile::backend::{ProfileBackend, ProfileError};
    use crate::profile::models::ProfileRecord;
    use crate::profile::SectionWeightConfig;

    const BOUNDARY: &str = "jobboard-test-boundary";

    struct FakeProfiles;

    #[async_trait]
    impl ProfileBackend for FakeProfiles {
        async fn fetch(&self, token: &BearerToken) -> Result<ProfileRecord, ProfileError> {
            if token.0 == "expired" {
                return Err(ProfileError::Unauthorized);
            }
            Ok(ProfileRecord {
                profile_summary: "Backend engineer".to_string(),
                key_skills: "Rust, SQL".to_string(),
                ..ProfileRecord::default()
            })
        }

        async fn update(
            &self,
            _token: &BearerToken,
            record: &ProfileRecord,
        ) -> Result<ProfileRecord, ProfileError> {
            Ok(record.clone())
        }
    }

    struct InstantStore;

    #[async_trait]
    impl DocumentStore for InstantStore {
        async fn upload(
            &self,
            file: &PendingFile,
            destination: &str,
            progress: UploadProgress,
        ) -> Result<String, UploadError> {
            progress.report(file.len(), file.len());
            Ok(format!("memory://{destination}/{}", file.file_name))
        }
    }

    struct InstantAnalysis;

    #[async_trait]
    impl AnalysisBackend for InstantAnalysis {
        async fn analyze(
            &self,
            _document_url: &str,
            _token: &BearerToken,
        ) -> Result<AtsReport, AnalysisError> {
            Ok(serde_json::from_value(json!({ "ATS_Score": 72 }))?)
        }
    }

    fn test_state() -> AppState {
        let deps = SessionDeps {
            store: Arc::new(InstantStore),
            analysis: Arc::new(InstantAnalysis),
            destination: "ats-resumes".to_string(),
            pacing: Pacing::default(),
        };
        AppState {
            weights: Arc::new(SectionWeightConfig::default()),
            profile_backend: Arc::new(FakeProfiles),
            sessions: SessionRegistry::new(deps, Duration::from_secs(60)),
        }
    }

    fn upload_request(uri: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, "Bearer tok")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = build_router(test_state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["service"], "jobboard-api");
    }

    #[tokio::test]
    async fn test_score_posted_record() {
        let request = Request::post("/api/v1/profile/completion")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "profileSummary": "Hi", "keySkills": "Rust" }).to_string(),
            ))
            .unwrap();
        let response = build_router(test_state()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["percentage"], 30);
        assert!(body["missingDetails"].as_array().unwrap().len() <= 11);
    }

    #[tokio::test]
    async fn test_profile_requires_bearer() {
        let response = build_router(test_state())
            .oneshot(Request::get("/api/v1/profile").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_profile_backend_rejection_is_unauthorized() {
        let request = Request::get("/api/v1/profile")
            .header(header::AUTHORIZATION, "Bearer expired")
            .body(Body::empty())
            .unwrap();
        let response = build_router(test_state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_get_profile_includes_completion() {
        let request = Request::get("/api/v1/profile")
            .header(header::AUTHORIZATION, "Bearer tok")
            .body(Body::empty())
            .unwrap();
        let response = build_router(test_state()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["profile"]["profileSummary"], "Backend engineer");
        assert_eq!(body["completion"]["percentage"], 30);
    }

    #[tokio::test]
    async fn test_update_profile_accepts_nulls_and_keeps_extra_fields() {
        let request = Request::put("/api/v1/profile")
            .header(header::AUTHORIZATION, "Bearer tok")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "fullName": "Asha Rao",
                    "keySkills": "Rust",
                    "profileSummary": null,
                    "careerPreferences": null
                })
                .to_string(),
            ))
            .unwrap();
        let response = build_router(test_state()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["profile"]["fullName"], "Asha Rao");
        assert_eq!(body["completion"]["percentage"], 15);
    }

    #[tokio::test]
    async fn test_steps_listed_in_order() {
        let response = build_router(test_state())
            .oneshot(Request::get("/api/v1/ats/steps").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        let steps = body["steps"].as_array().unwrap();
        assert_eq!(steps.len(), 7);
        assert_eq!(steps[0], "Uploading your resume");
    }

    #[tokio::test]
    async fn test_non_pdf_upload_creates_no_session() {
        let state = test_state();
        let request = upload_request("/api/v1/ats/sessions", "cv.docx", "application/msword", b"PK");
        let response = build_router(state.clone()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(state.sessions.len().await, 0);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let state = test_state();
        let app = build_router(state.clone());

        let request = upload_request(
            "/api/v1/ats/sessions",
            "cv.pdf",
            "application/pdf",
            b"%PDF-1.7 resume",
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await;
        let id = created["sessionId"].as_str().unwrap().to_string();
        assert_eq!(created["session"]["fileName"], "cv.pdf");
        assert!(created["session"]["error"].is_null());

        let uri = format!("/api/v1/ats/sessions/{id}");
        let response = app
            .clone()
            .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(Request::delete(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_resubmit_unknown_session_is_not_found() {
        let uri = format!("/api/v1/ats/sessions/{}/submit", uuid::Uuid::new_v4());
        let request = upload_request(&uri, "cv.pdf", "application/pdf", b"%PDF-1.4");
        let response = build_router(test_state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
