//! Error responses for the HTTP API.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::llm::LlmError;
use crate::sessions::StoreError;

/// Errors returned by route handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required query parameter is missing or empty.
    #[error("Missing {0} in request")]
    MissingParameter(&'static str),
    /// The JSON body could not be read or does not match the schema.
    #[error("{0}")]
    InvalidBody(#[from] JsonRejection),
    /// The query string could not be parsed.
    #[error("{0}")]
    InvalidQuery(#[from] QueryRejection),
    /// The session store failed.
    #[error("session store error: {0}")]
    Store(#[from] StoreError),
    /// The completion API failed.
    #[error("summary generation failed: {0}")]
    Generation(#[from] LlmError),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub detail: String,
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) => StatusCode::BAD_REQUEST,
            Self::InvalidBody(rejection) => rejection.status(),
            Self::InvalidQuery(rejection) => rejection.status(),
            Self::Store(_) | Self::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status.is_server_error() {
            tracing::error!("Request failed: {self}");
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::MissingParameter("user").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Generation(LlmError::MissingApiKey).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let io = std::io::Error::other("disk full");
        assert_eq!(
            ApiError::Store(StoreError::Io(io)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_rejection_keeps_status_and_message() {
        use axum::body::{Body, to_bytes};
        use axum::extract::FromRequest;
        use axum::http::Request;

        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"user":"alice","summary":"ok"}"#))
            .unwrap();
        let rejection = Json::<crate::sessions::SessionSummary>::from_request(request, &())
            .await
            .unwrap_err();

        let response = ApiError::from(rejection).into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(
            body["detail"]
                .as_str()
                .unwrap()
                .contains("missing field `patient`")
        );
    }

    #[test]
    fn test_missing_parameter_message() {
        assert_eq!(
            ApiError::MissingParameter("session_id").to_string(),
            "Missing session_id in request"
        );
    }
}
