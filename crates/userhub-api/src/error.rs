//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Every route failure, whether raised while validating a request or while
//! executing it, is an [`AppError`] variant that carries its HTTP status.
//! Returns JSON error bodies with a machine-readable code and a message.
//! Never exposes internal error details in responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use userhub_core::{StoreError, ValidationError};

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "MISSING_FIELD", "METADATA_NOT_FOUND").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Structured context for the client, such as the offending field name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// A required path parameter or body field is absent or empty (400).
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A field is present but unusable (400).
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// An id does not resolve to a stored record (400).
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// A metadata value is not a JSON document (400).
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// An update targets a metadata key that was never set (400).
    #[error("metadata does not exist: {0}")]
    MetadataMissing(String),

    /// A read targets a metadata key that was never set (404).
    #[error("metadata not found: {0}")]
    MetadataNotFound(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No registered route matches the path (404).
    #[error("no route for {0}")]
    RouteNotFound(String),

    /// A route matches the path but not the verb (405).
    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },

    /// Authentication failure: missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authorization failure: insufficient level or permission (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::MissingField(_) => (StatusCode::BAD_REQUEST, "MISSING_FIELD"),
            Self::InvalidField(_) => (StatusCode::BAD_REQUEST, "INVALID_FIELD"),
            Self::InvalidReference(_) => (StatusCode::BAD_REQUEST, "INVALID_REFERENCE"),
            Self::InvalidJson(_) => (StatusCode::BAD_REQUEST, "INVALID_JSON"),
            Self::MetadataMissing(_) => (StatusCode::BAD_REQUEST, "METADATA_MISSING"),
            Self::MetadataNotFound(_) => (StatusCode::NOT_FOUND, "METADATA_NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::RouteNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::MethodNotAllowed { .. } => (StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// The HTTP status this error is surfaced with.
    pub fn status(&self) -> StatusCode {
        self.status_and_code().0
    }

    /// Machine-readable context carried in the `details` member.
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::MissingField(field) => Some(serde_json::json!({ "field": field })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Malformed ids and unknown app names are unresolvable references.
impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidReference(err.to_string())
    }
}

/// Store failures surfacing during exec.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::UserNotFound(_) => Self::InvalidReference(err.to_string()),
            StoreError::DuplicateIdentity { .. } => Self::Conflict(err.to_string()),
            StoreError::Backend(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("response serialization failed: {err}"))
    }
}
