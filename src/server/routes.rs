//! HTTP route handlers for the session notes API.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::sessions::{GenerateSessionSummary, SessionSummary};

use super::error::ApiError;
use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/session_summary",
            get(get_session_summary)
                .post(post_session_summary)
                .delete(delete_session_summary),
        )
        .route("/user_session_summaries", get(get_user_session_summaries))
        .route(
            "/generate_session_summary",
            post(post_generate_session_summary),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "session-notes",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Query string carrying a session id.
#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    /// Session identifier.
    pub session_id: Option<String>,
}

/// Query string carrying a user reference.
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    /// User reference.
    pub user: Option<String>,
}

/// Response to an upsert.
#[derive(Debug, Serialize, Deserialize)]
pub struct WriteSessionResponse {
    /// Identifier assigned or used.
    pub id: String,
}

/// Response listing a user's sessions.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserSessionsResponse {
    /// Matching records, in storage order.
    pub sessions: Vec<SessionSummary>,
}

/// Response carrying generated text.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateSessionSummaryResponse {
    /// Model output, unmodified; `null` when the model returned no content.
    pub session_summary: Option<String>,
}

/// Empty values count as missing.
fn required(value: Option<String>, name: &'static str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::MissingParameter(name))
}

/// Return the records stored under `session_id` (an empty list on a miss).
async fn get_session_summary(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SessionQuery>, QueryRejection>,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    let Query(query) = query?;
    let session_id = required(query.session_id, "session_id")?;
    let sessions = state.store.get_session(&session_id).await?;
    Ok(Json(sessions))
}

/// Insert a new record, or overwrite the one named by the body's `id`.
async fn post_session_summary(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SessionSummary>, JsonRejection>,
) -> Result<Json<WriteSessionResponse>, ApiError> {
    let Json(summary) = body?;
    let session_id = summary.id.clone().filter(|id| !id.is_empty());
    let id = state.store.write_session(summary, session_id).await?;
    Ok(Json(WriteSessionResponse { id }))
}

/// Delete the record stored under `session_id`.
async fn delete_session_summary(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SessionQuery>, QueryRejection>,
) -> Result<StatusCode, ApiError> {
    let Query(query) = query?;
    let session_id = required(query.session_id, "session_id")?;
    state.store.delete_session(&session_id).await?;
    Ok(StatusCode::OK)
}

/// List every record belonging to `user`.
async fn get_user_session_summaries(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<UserSessionsResponse>, ApiError> {
    let Query(query) = query?;
    let user = required(query.user, "user")?;
    let sessions = state.store.get_sessions_by_user(&user).await?;
    Ok(Json(UserSessionsResponse { sessions }))
}

/// Generate a summary from raw notes.
async fn post_generate_session_summary(
    State(state): State<Arc<AppState>>,
    body: Result<Json<GenerateSessionSummary>, JsonRejection>,
) -> Result<Json<GenerateSessionSummaryResponse>, ApiError> {
    let Json(request) = body?;
    let session_summary = state.generator.generate(&request.notes).await?;
    Ok(Json(GenerateSessionSummaryResponse { session_summary }))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::llm::{GenerateFuture, LlmError, LlmResult, SummaryGenerator};
    use crate::sessions::JsonSessionStore;

    /// Echoes the notes back, answers `None` for empty notes, or fails when asked to.
    struct FakeGenerator {
        fail: bool,
    }

    impl SummaryGenerator for FakeGenerator {
        fn generate(&self, notes: &str) -> GenerateFuture<'_, LlmResult<Option<String>>> {
            let result = if self.fail {
                Err(LlmError::MalformedResponse("boom".to_string()))
            } else if notes.is_empty() {
                Ok(None)
            } else {
                Ok(Some(format!("SOAP: {notes}")))
            };
            Box::pin(async move { result })
        }
    }

    async fn test_app(fail: bool) -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSessionStore::open(dir.path().join("db.json"))
            .await
            .unwrap();
        let state = AppState::new(Arc::new(store), Arc::new(FakeGenerator { fail }));
        (dir, create_router(state))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_post_then_get_round_trip() {
        let (_dir, app) = test_app(false).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/session_summary",
            Some(json!({"user": "alice", "summary": "ok", "patient": "bob"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/session_summary?session_id={id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{
                "id": id,
                "user": "alice",
                "summary": "ok",
                "duration": null,
                "type": null,
                "patient": "bob",
                "date": null
            }])
        );
    }

    #[tokio::test]
    async fn test_post_with_id_updates_in_place() {
        let (_dir, app) = test_app(false).await;
        let (_, body) = send(
            &app,
            Method::POST,
            "/session_summary",
            Some(json!({"user": "alice", "summary": "draft", "patient": "bob"})),
        )
        .await;
        let id = body["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::POST,
            "/session_summary",
            Some(json!({"id": id, "user": "alice", "summary": "final", "patient": "bob", "duration": 45})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id.as_str());

        let (_, body) = send(&app, Method::GET, "/user_session_summaries?user=alice", None).await;
        let sessions = body["sessions"].as_array().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0]["summary"], "final");
        assert_eq!(sessions[0]["duration"], 45);
    }

    #[tokio::test]
    async fn test_user_listing_and_delete() {
        let (_dir, app) = test_app(false).await;
        let mut ids = Vec::new();
        for user in ["alice", "bea", "alice"] {
            let (_, body) = send(
                &app,
                Method::POST,
                "/session_summary",
                Some(json!({"user": user, "summary": "s", "patient": "p"})),
            )
            .await;
            ids.push(body["id"].as_str().unwrap().to_string());
        }

        let (status, body) = send(&app, Method::GET, "/user_session_summaries?user=alice", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessions"].as_array().unwrap().len(), 2);

        let (status, body) = send(
            &app,
            Method::DELETE,
            &format!("/session_summary?session_id={}", ids[0]),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Null);

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/session_summary?session_id={}", ids[0]),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (_, body) = send(&app, Method::GET, "/user_session_summaries?user=alice", None).await;
        assert_eq!(body["sessions"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_user_returns_empty_list() {
        let (_dir, app) = test_app(false).await;
        let (status, body) = send(&app, Method::GET, "/user_session_summaries?user=nobody", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"sessions": []}));
    }

    #[tokio::test]
    async fn test_missing_query_parameters_are_bad_requests() {
        let (_dir, app) = test_app(false).await;

        for (method, uri) in [
            (Method::GET, "/session_summary"),
            (Method::GET, "/session_summary?session_id="),
            (Method::DELETE, "/session_summary"),
            (Method::GET, "/user_session_summaries"),
            (Method::GET, "/user_session_summaries?other=1"),
        ] {
            let (status, body) = send(&app, method, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["detail"].as_str().unwrap().starts_with("Missing"));
        }
    }

    #[tokio::test]
    async fn test_invalid_body_is_rejected_with_json_detail() {
        let (_dir, app) = test_app(false).await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/session_summary",
            Some(json!({"user": "alice"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("summary"));

        let (status, body) = send(
            &app,
            Method::POST,
            "/generate_session_summary",
            Some(json!({"text": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("notes"));
    }

    #[tokio::test]
    async fn test_unparsable_body_is_rejected_with_json_detail() {
        let (_dir, app) = test_app(false).await;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/session_summary")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["content-type"], "application/json");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_query_is_rejected_with_json_detail() {
        let (_dir, app) = test_app(false).await;
        let (status, body) = send(
            &app,
            Method::GET,
            "/session_summary?session_id=a&session_id=b",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("session_id"));
    }

    #[tokio::test]
    async fn test_generate_returns_generator_output() {
        let (_dir, app) = test_app(false).await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/generate_session_summary",
            Some(json!({"notes": "patient calm"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"session_summary": "SOAP: patient calm"}));
    }

    #[tokio::test]
    async fn test_generate_passes_null_output_through() {
        let (_dir, app) = test_app(false).await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/generate_session_summary",
            Some(json!({"notes": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"session_summary": null}));
    }

    #[tokio::test]
    async fn test_generate_failure_is_server_error() {
        let (_dir, app) = test_app(true).await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/generate_session_summary",
            Some(json!({"notes": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal Server Error");
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_dir, app) = test_app(false).await;
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
