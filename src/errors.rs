use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

/// Domain-specific error types for the pricing toolkit.
/// Pricing preconditions fail the single call with the offending parameter named.
/// Degenerate hedge ratios are NOT errors: they propagate as non-finite floats.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid parameter {name}: {value} (must be finite and > 0)")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("invalid strike grid: {0}")]
    InvalidGrid(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("market data error: {0}")]
    MarketData(String),

    #[error("config error: {0}")]
    Config(String),
}

impl EngineError {
    /// Client-side input problems map to 400, upstream failures to 502.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidParameter { .. } | Self::InvalidGrid(_) | Self::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Network(_) | Self::Parse(_) | Self::MarketData(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        EngineError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Network(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
