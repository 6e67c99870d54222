//! Error types module
//!
//! All pipeline errors are unified under the `PipelineError` enum. Every
//! variant knows whether it is recoverable (a retried trigger may succeed)
//! and how it should be presented over HTTP.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the
//! `sqlx` feature.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Missing or malformed required field. Rejected before any mutation,
    /// never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced record or subscription does not exist.
    #[error("Not found: {0}")]
    Lookup(String),

    /// The detection engine could not decode the content
    /// (corrupt file, unsupported codec).
    #[error("Decode error: {0}")]
    Decode(String),

    /// The detection engine failed internally or timed out.
    #[error("Detection engine error: {0}")]
    Engine(String),

    /// Notification channel create/publish/attach/detach failure.
    /// Isolated per tag; never aborts the overall fan-out.
    #[error("Notification channel error: {0}")]
    Channel(String),

    /// Object store failure.
    #[error("Storage error: {0}")]
    Storage(String),

    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Internal error: {0}")]
    Internal(#[source] anyhow::Error),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for PipelineError {
    fn from(err: SqlxError) -> Self {
        PipelineError::Database(err)
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Internal(err)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Internal(anyhow::anyhow!("JSON conversion error: {}", err))
    }
}

impl PipelineError {
    /// Machine-readable error code (e.g. "ENGINE_ERROR").
    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "VALIDATION_ERROR",
            PipelineError::Lookup(_) => "NOT_FOUND",
            PipelineError::Decode(_) => "DECODE_ERROR",
            PipelineError::Engine(_) => "ENGINE_ERROR",
            PipelineError::Channel(_) => "CHANNEL_ERROR",
            PipelineError::Storage(_) => "STORAGE_ERROR",
            #[cfg(feature = "sqlx")]
            PipelineError::Database(_) => "DATABASE_ERROR",
            PipelineError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code to return when this error surfaces at the API.
    pub fn http_status_code(&self) -> u16 {
        match self {
            PipelineError::Validation(_) => 400,
            PipelineError::Lookup(_) => 404,
            PipelineError::Decode(_) => 422,
            PipelineError::Engine(_) => 502,
            PipelineError::Channel(_) => 502,
            PipelineError::Storage(_) => 500,
            #[cfg(feature = "sqlx")]
            PipelineError::Database(_) => 500,
            PipelineError::Internal(_) => 500,
        }
    }

    /// Whether a retried trigger can succeed where this attempt failed.
    /// Validation and decode failures are deterministic and never retried.
    pub fn is_recoverable(&self) -> bool {
        match self {
            PipelineError::Validation(_) => false,
            PipelineError::Lookup(_) => false,
            PipelineError::Decode(_) => false,
            PipelineError::Engine(_) => true,
            PipelineError::Channel(_) => true,
            PipelineError::Storage(_) => true,
            #[cfg(feature = "sqlx")]
            PipelineError::Database(_) => true,
            PipelineError::Internal(_) => true,
        }
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            PipelineError::Validation(_) | PipelineError::Lookup(_) => LogLevel::Debug,
            PipelineError::Decode(_) | PipelineError::Channel(_) => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_unrecoverable_bad_request() {
        let err = PipelineError::Validation("email is required".to_string());
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(!err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn engine_errors_are_recoverable() {
        let err = PipelineError::Engine("inference timed out".to_string());
        assert_eq!(err.http_status_code(), 502);
        assert!(err.is_recoverable());
    }

    #[test]
    fn decode_errors_are_not_retried() {
        let err = PipelineError::Decode("not a valid mp4".to_string());
        assert_eq!(err.error_code(), "DECODE_ERROR");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn lookup_maps_to_404() {
        let err = PipelineError::Lookup("media record not found".to_string());
        assert_eq!(err.http_status_code(), 404);
    }
}
