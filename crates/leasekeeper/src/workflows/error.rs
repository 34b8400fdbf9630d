use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::store::StoreError;

/// Typed failure returned by every workflow operation.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("No available vendor found")]
    NoVendorAvailable,
    #[error("invalid or expired token")]
    InvalidOrExpiredToken,
    #[error("authentication required")]
    Unauthorized,
    #[error("signing secret is not configured")]
    SigningSecretMissing,
    #[error("credential processing failed: {0}")]
    Credential(String),
    #[error("persistence failure: {0}")]
    Persistence(StoreError),
}

impl WorkflowError {
    pub fn missing_fields() -> Self {
        Self::Validation("Missing required fields".to_string())
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
            WorkflowError::NotFound(_)
            | WorkflowError::NoVendorAvailable
            | WorkflowError::InvalidOrExpiredToken => StatusCode::NOT_FOUND,
            WorkflowError::Conflict(_) => StatusCode::CONFLICT,
            WorkflowError::Unauthorized => StatusCode::UNAUTHORIZED,
            WorkflowError::SigningSecretMissing
            | WorkflowError::Credential(_)
            | WorkflowError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(reason) => Self::Conflict(reason),
            StoreError::NotFound => Self::NotFound("record"),
            unavailable @ StoreError::Unavailable(_) => Self::Persistence(unavailable),
        }
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "workflow failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
