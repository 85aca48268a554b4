//! Proxy error type.
//!
//! Handlers return `Result<T, ServerError>`; the error renders as a JSON
//! `{"error": "..."}` body with a matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shared::{AssistantError, ErrorKind, ErrorResponse};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent a missing or malformed parameter.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The search upstream or the proxy's own configuration failed.
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl From<AssistantError> for ServerError {
    fn from(e: AssistantError) -> Self {
        match e.kind() {
            ErrorKind::Input => ServerError::BadRequest(e.to_string()),
            _ => ServerError::Upstream(e.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServerError::BadRequest(m) => {
                warn!(message = %m, "rejected search request");
                (StatusCode::BAD_REQUEST, m)
            }
            ServerError::Upstream(m) => {
                error!(message = %m, "search request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
