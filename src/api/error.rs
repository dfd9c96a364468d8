use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::error::PlannerError;
use crate::persistence::StoreError;
use crate::pipeline::PipelineFailure;

/// Error body shared by every handler.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: i64,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    InvalidContext(#[from] PlannerError),
    #[error(transparent)]
    Pipeline(#[from] PipelineFailure),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidContext(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST")
            }
            ApiError::Pipeline(_) => (StatusCode::BAD_REQUEST, "PIPELINE_FAILED"),
            ApiError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!("❌ {}", self);
        }
        let body = ErrorResponse {
            error: code.to_string(),
            message: self.to_string(),
            timestamp: Utc::now().timestamp(),
        };
        (status, Json(body)).into_response()
    }
}
