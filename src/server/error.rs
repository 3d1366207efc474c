//! JSON error responses.
//!
//! Every failing handler returns an [`ApiErrorResponse`]; its body is an
//! [`ApiError`] of the form `{"code": "...", "message": "..."}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::database::DatabaseError;
use crate::models::InvalidCategory;
use crate::store::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Status code plus error body.
#[derive(Debug, Clone)]
pub struct ApiErrorResponse {
    pub status: StatusCode,
    pub error: ApiError,
}

impl ApiErrorResponse {
    pub fn new(status: StatusCode, error: ApiError) -> Self {
        Self { status, error }
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiError::new(code, message))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            ApiError::new("INVALID_CREDENTIALS", message),
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", message))
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, ApiError::new(code, message))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::new("INTERNAL_ERROR", message),
        )
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<InvalidCategory> for ApiErrorResponse {
    fn from(error: InvalidCategory) -> Self {
        Self::bad_request("INVALID_CATEGORY", error.to_string())
    }
}

impl From<StoreError> for ApiErrorResponse {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(_) => Self::not_found(error.to_string()),
            StoreError::InvalidCategory(invalid) => Self::from(invalid),
            StoreError::DuplicateIdentifier(_) => {
                Self::conflict("DUPLICATE_TASK", error.to_string())
            }
            StoreError::IdsExhausted(_) => Self::conflict("IDS_EXHAUSTED", error.to_string()),
        }
    }
}

impl From<DatabaseError> for ApiErrorResponse {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound { .. } => Self::not_found(error.to_string()),
            DatabaseError::EmailTaken(_) => {
                Self::conflict("USER_EXISTS", "User account already exists")
            }
            DatabaseError::AlreadyAssigned { .. } => {
                Self::conflict("ALREADY_ASSIGNED", error.to_string())
            }
            DatabaseError::Store(store) => Self::from(store),
            // Internal details are logged, never returned
            DatabaseError::SqliteError(_) | DatabaseError::DirectoryError(_) => {
                tracing::error!(%error, "Database failure");
                Self::internal_error("An internal error occurred")
            }
        }
    }
}

impl From<JsonRejection> for ApiErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request("INVALID_JSON", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiErrorResponse {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request("INVALID_QUERY", rejection.body_text())
    }
}
