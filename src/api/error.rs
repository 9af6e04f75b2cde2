//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::DatabaseError;
use crate::patients::validate::FieldErrors;
use crate::patients::PatientError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    /// Field → messages map, present on validation errors only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FieldErrors>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation { details: FieldErrors },
    #[error("{0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Gone: {0}")]
    Gone(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            ApiError::Validation { details } => (
                StatusCode::BAD_REQUEST,
                "VALIDATION",
                "Validation failed".to_string(),
                Some(details),
            ),
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "CONFLICT", detail, None),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail, None),
            ApiError::Gone(detail) => (StatusCode::GONE, "GONE", detail, None),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail, None)
            }
            ApiError::Internal(detail) => {
                tracing::error!(%detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<PatientError> for ApiError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::Validation(details) => ApiError::Validation { details },
            PatientError::Conflict(message) => ApiError::Conflict(message),
            PatientError::NotFound => ApiError::NotFound("Patient not found".into()),
            PatientError::Gone => ApiError::Gone("This patient has been archived".into()),
            PatientError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;
    use crate::patients::validate::push_error;

    #[tokio::test]
    async fn validation_returns_400_with_details() {
        let mut details = FieldErrors::new();
        push_error(&mut details, "phone", "must be at least 10 characters");

        let response = ApiError::Validation { details }.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "VALIDATION");
        assert_eq!(
            json["error"]["details"]["phone"][0],
            "must be at least 10 characters"
        );
    }

    #[tokio::test]
    async fn conflict_returns_409() {
        let response = ApiError::Conflict("duplicate national ID".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn not_found_returns_404() {
        let response = ApiError::NotFound("Patient not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn gone_returns_410() {
        let response = ApiError::Gone("archived".into()).into_response();
        assert_eq!(response.status(), StatusCode::GONE);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "GONE");
    }

    #[tokio::test]
    async fn bad_request_returns_400() {
        let response = ApiError::BadRequest("Invalid ID format".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn internal_returns_500_and_hides_detail() {
        let response = ApiError::Internal("disk exploded".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        // Internal errors hide details from the client
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn non_validation_errors_omit_details() {
        let response = ApiError::NotFound("nope".into()).into_response();
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn patient_errors_map_onto_statuses() {
        for (err, status) in [
            (PatientError::NotFound, StatusCode::NOT_FOUND),
            (PatientError::Gone, StatusCode::GONE),
            (
                PatientError::Conflict("dup".into()),
                StatusCode::CONFLICT,
            ),
            (
                PatientError::Validation(FieldErrors::new()),
                StatusCode::BAD_REQUEST,
            ),
        ] {
            let api_err: ApiError = err.into();
            assert_eq!(api_err.into_response().status(), status);
        }
    }
}
