use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model artifact error: {0}")]
    Artifact(String),

    /// Request-shape violation; the message is shown to the caller as-is.
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid request payload: {0}")]
    Payload(#[from] JsonRejection),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({
            "status": "error",
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Failures inside the feature/prediction pipeline. Never reach the client:
/// the predictor turns every one of these into a fallback price.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("scaler expects {expected} numerical columns, got {actual}")]
    ScalerWidth { expected: usize, actual: usize },

    #[error("categorical feature '{0}' has no encoder and cannot be fed to the model")]
    Unencoded(String),

    #[error("model expects {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("malformed tree {tree}: {reason}")]
    InvalidTree { tree: usize, reason: String },
}
