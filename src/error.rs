use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Operation on {0} timed out")]
    Timeout(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message bus error: {0}")]
    Bus(String),

    #[error("Bet stop for fixture {0} with no cached markets")]
    UnknownFixture(i64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;

impl IntoResponse for CacheError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            CacheError::UnknownFixture(_) => StatusCode::NOT_FOUND,
            CacheError::Config(_) | CacheError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, self.to_string()).into_response()
    }
}
