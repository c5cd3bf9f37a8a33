use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Routing error: {0}")]
    RoutingError(String),

    #[error("Invalid upstream response: {0}")]
    InvalidUpstreamResponse(String),

    #[error("Transformation error: {0}")]
    TransformationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Plugin error: {0}")]
    PluginError(String),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Client disconnected")]
    ClientDisconnected,

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RouterError>;

impl RouterError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RouterError::InvalidRequest(_) | RouterError::RoutingError(_) => StatusCode::BAD_REQUEST,
            RouterError::UpstreamError(_) | RouterError::InvalidUpstreamResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal failures are not echoed back to the client
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };
        (status, message).into_response()
    }
}
