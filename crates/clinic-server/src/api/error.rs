//! API error types with structured JSON responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use clinic_core::models::FieldError;
use clinic_core::{DbError, ValidationErrors};

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    Validation(ValidationErrors),
    #[error("Malformed request body: {0}")]
    MalformedBody(String),
    #[error("Visit limit exceeded")]
    VisitLimitExceeded,
    #[error("Visit number taken: {0}")]
    VisitNumberTaken(String),
    #[error("Invalid reference: {0}")]
    InvalidReference(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Authentication required")]
    Unauthorized,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Failed to {action}: {detail}")]
    Internal {
        action: &'static str,
        detail: String,
    },
}

impl ApiError {
    pub fn internal(action: &'static str, detail: impl ToString) -> Self {
        ApiError::Internal {
            action,
            detail: detail.to_string(),
        }
    }

    /// Map a storage error raised while trying to `action`.
    ///
    /// Business-rule failures keep their own status; anything else is an
    /// internal error reported as "Failed to <action>".
    pub fn storage(action: &'static str) -> impl FnOnce(DbError) -> ApiError {
        move |err| match err {
            DbError::VisitLimitExceeded { .. } => ApiError::VisitLimitExceeded,
            DbError::DuplicateVisitNumber { .. } => ApiError::VisitNumberTaken(err.to_string()),
            DbError::UnknownReference(_) | DbError::PatientMismatch { .. } => {
                ApiError::InvalidReference(err.to_string())
            }
            DbError::Constraint(detail) => ApiError::Conflict(detail),
            other => ApiError::internal(action, other),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                "Invalid request data".to_string(),
                Some(errors.errors),
            ),
            ApiError::MalformedBody(detail) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                detail,
                None,
            ),
            ApiError::VisitLimitExceeded => (
                StatusCode::BAD_REQUEST,
                "VISIT_LIMIT_EXCEEDED",
                "Visit limit exceeded".to_string(),
                None,
            ),
            ApiError::VisitNumberTaken(detail) => (
                StatusCode::BAD_REQUEST,
                "VISIT_NUMBER_TAKEN",
                detail,
                None,
            ),
            ApiError::InvalidReference(detail) => (
                StatusCode::BAD_REQUEST,
                "INVALID_REFERENCE",
                detail,
                None,
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail, None),
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "CONFLICT", detail, None),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
                None,
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
                None,
            ),
            ApiError::Internal { action, detail } => {
                tracing::error!(action, detail = %detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    format!("Failed to {action}"),
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
