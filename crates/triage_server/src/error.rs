//! Server error types

use axum::response::{IntoResponse, Response};
use triage_api::ApiError;
use triage_core::CoreError;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid address: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ServerError> for ApiError {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Core(e) => ApiError::from(e),
            ServerError::Api(e) => e,
            ServerError::Jwt(_) => ApiError::unauthorized("Invalid or expired token"),
            ServerError::Config(message) => ApiError::ServiceUnavailable {
                message,
                retry_after_seconds: None,
            },
            other => ApiError::ServiceUnavailable {
                message: other.to_string(),
                retry_after_seconds: Some(30),
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        // Convert to ApiError for consistent error responses
        ApiError::from(self).into_response()
    }
}
