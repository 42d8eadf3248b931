//! HTTP error mapping
//!
//! Wraps the common error taxonomy so handlers can return it with `?` and
//! get consistent status codes and JSON bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use speedwall_common::Error;

/// Handler-facing result type
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Newtype so we can implement `IntoResponse` for the shared error enum
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<speedwall_common::FieldErrors>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, fields) = match &self.0 {
            Error::InvalidInput(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_input", None),
            Error::Validation(fields) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_failure",
                Some(fields.clone()),
            ),
            Error::StorageFailure(_) => (StatusCode::BAD_GATEWAY, "storage_failure", None),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", None),
            Error::Database(_) | Error::Io(_) | Error::Config(_) | Error::Internal(_) => {
                error!("internal error: {}", self.0);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", None)
            }
        };

        let body = ErrorBody {
            error,
            message: self.0.to_string(),
            fields,
        };
        (status, Json(body)).into_response()
    }
}
