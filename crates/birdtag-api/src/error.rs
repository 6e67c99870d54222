//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpError>`; `PipelineError`
//! converts into `HttpError` and renders consistently (status, body,
//! logging).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use birdtag_core::{LogLevel, PipelineError};

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
}

/// Wrapper type for PipelineError to implement IntoResponse.
/// Necessary because of Rust's orphan rules: IntoResponse is an external
/// trait and PipelineError lives in birdtag-core.
#[derive(Debug)]
pub struct HttpError(pub PipelineError);

impl From<PipelineError> for HttpError {
    fn from(err: PipelineError) -> Self {
        HttpError(err)
    }
}

impl From<anyhow::Error> for HttpError {
    fn from(err: anyhow::Error) -> Self {
        HttpError(PipelineError::Internal(err))
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let err = self.0;

        match err.log_level() {
            LogLevel::Debug => tracing::debug!(error = %err, "Request failed"),
            LogLevel::Warn => tracing::warn!(error = %err, "Request failed"),
            LogLevel::Error => tracing::error!(error = %err, "Request failed"),
        }

        let status = StatusCode::from_u16(err.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse {
            error: err.to_string(),
            code: err.error_code().to_string(),
            recoverable: err.is_recoverable(),
        };

        (status, Json(body)).into_response()
    }
}
