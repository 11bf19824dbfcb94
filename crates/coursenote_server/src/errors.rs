//! HTTP error envelope.
//!
//! Every error body is `{"error": <message>, "code": <stable code>}`; the
//! message names the offending field or identifier.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use coursenote_core::AnnotationServiceError;
use log::error;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: &'static str,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "validation_error",
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "not_found",
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "storage_failure",
            message: message.into(),
        }
    }
}

impl From<AnnotationServiceError> for ApiError {
    fn from(value: AnnotationServiceError) -> Self {
        match &value {
            AnnotationServiceError::InvalidAnnotation(_)
            | AnnotationServiceError::InvalidTime(_) => Self::bad_request(value.to_string()),
            AnnotationServiceError::NotFound(_) => Self::not_found(value.to_string()),
            AnnotationServiceError::Repo(_) | AnnotationServiceError::InconsistentState(_) => {
                error!(
                    "event=request_failed module=http status=error error_code=storage_failure error={}",
                    value
                );
                Self::internal(value.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}
