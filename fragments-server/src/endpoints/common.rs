//! Common types and utilities for API endpoints.

use std::error::Error;

use axum::Json;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Error type for API operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request does not identify an owner.
    #[error("authentication required")]
    Unauthenticated,

    /// Malformed or illegal requests.
    #[error("{0}")]
    BadRequest(String),

    /// The request or the requested representation uses an unsupported media type.
    #[error("{0}")]
    UnsupportedMediaType(String),

    /// The request body could not be read, for example because it exceeds the size limit.
    #[error(transparent)]
    Body(#[from] BytesRejection),

    /// Errors from fragment operations.
    #[error(transparent)]
    Fragment(#[from] fragments_service::Error),

    /// Unexpected failures, such as panics in handlers.
    #[error("internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status(&self) -> StatusCode {
        use fragments_service::Error as E;

        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Body(rejection) => rejection.status(),
            ApiError::Fragment(E::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Fragment(E::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Fragment(E::UnsupportedType(_) | E::ConversionUnsupported { .. }) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ApiError::Fragment(E::Backend(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Body of successful responses: `{"status": "ok", ...data}`.
#[derive(Debug, Serialize)]
pub struct ApiSuccess<T> {
    status: &'static str,
    #[serde(flatten)]
    data: T,
}

/// Wraps `data` into the success envelope. `data` must serialize as a map.
pub fn success<T: Serialize>(data: T) -> Json<ApiSuccess<T>> {
    Json(ApiSuccess { status: "ok", data })
}

/// Body of error responses: `{"status": "error", "error": {"code": 404, "message": "..."}}`.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    status: &'static str,
    error: ApiErrorDetail,
}

/// Details of an [`ApiErrorResponse`].
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    /// The HTTP status code.
    pub code: u16,
    /// Human readable description of the error.
    pub message: String,
}

impl ApiErrorResponse {
    /// Creates an error response for the given status and message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: "error",
            error: ApiErrorDetail {
                code: status.as_u16(),
                message: message.into(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            tracing::error!(error = &self as &dyn Error, "error handling request");
            // Backend details stay in the logs.
            "internal server error".to_owned()
        } else {
            tracing::debug!(error = &self as &dyn Error, "rejecting request");
            self.to_string()
        };

        let body = ApiErrorResponse::new(status, message);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use fragments_service::Error as E;

    use super::*;

    #[test]
    fn maps_fragment_errors() {
        let cases = [
            (E::Validation("x".into()), StatusCode::BAD_REQUEST),
            (E::NotFound { id: "x".into() }, StatusCode::NOT_FOUND),
            (E::UnsupportedType("x".into()), StatusCode::UNSUPPORTED_MEDIA_TYPE),
            (
                E::ConversionUnsupported {
                    from: "text/plain".into(),
                    to: "text/html".into(),
                },
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (
                E::Backend(std::io::Error::other("disk on fire").into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn error_envelope() {
        let body = ApiErrorResponse::new(StatusCode::NOT_FOUND, "fragment not found: x");
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "error",
                "error": { "code": 404, "message": "fragment not found: x" },
            })
        );
    }

    #[test]
    fn success_envelope() {
        let Json(body) = success(serde_json::json!({ "fragments": ["a", "b"] }));
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "status": "ok", "fragments": ["a", "b"] })
        );
    }
}
