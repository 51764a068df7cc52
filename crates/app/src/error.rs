use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use services::{GenerateError, PoolLoadError};
use thiserror::Error;
use tracing::error;

/// Errors a handler can answer with.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Reload(#[from] PoolLoadError),

    #[error("{0}")]
    Internal(String),
}

const INTERNAL_MESSAGE: &str = "internal server error";

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::MissingField(_) | ApiError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::Generate(GenerateError::Validation(e)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Generate(GenerateError::DataUnavailable) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "question bank is empty".to_owned(),
            ),
            _ => {
                error!(error = %self, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_owned())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(json!({ "error": message }))).into_response()
    }
}
