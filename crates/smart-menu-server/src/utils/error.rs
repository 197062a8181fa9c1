use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Upstream unreachable: {0}")]
    Unreachable(String),

    #[error("Malformed upstream payload: {0}")]
    MalformedPayload(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure envelope shared by every JSON route.
#[derive(Serialize)]
struct ErrorResponse {
    ok: bool,
    data: Value,
    error: String,
    message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Configuration(_) | ApiError::Unreachable(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::MalformedPayload(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Renders the envelope with a route-specific `data` placeholder
    /// (`null` for records, `[]` for lists).
    pub fn into_response_with_data(self, data: Value) -> Response {
        let status = self.status_code();
        let (error_type, message) = match self {
            ApiError::Configuration(msg) => {
                tracing::error!("Configuration error: {}", msg);
                ("Configuration", msg)
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                ("BadRequest", msg)
            }
            ApiError::NotFound(msg) => {
                tracing::warn!("Not found: {}", msg);
                ("NotFound", msg)
            }
            ApiError::Upstream { status, message } => {
                tracing::error!("Upstream error ({}): {}", status, message);
                ("Upstream", message)
            }
            ApiError::Unreachable(msg) => {
                tracing::error!("Upstream unreachable: {}", msg);
                ("Unreachable", msg)
            }
            ApiError::MalformedPayload(msg) => {
                tracing::error!("Malformed upstream payload: {}", msg);
                ("MalformedPayload", msg)
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal", msg)
            }
        };

        let body = Json(ErrorResponse {
            ok: false,
            data,
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_response_with_data(Value::Null)
    }
}
