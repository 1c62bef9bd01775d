use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conflicting_exam_id: Option<String>,
}

impl ErrorResponse {
    fn new(status: StatusCode, detail: String) -> Self {
        Self { status: status.as_u16(), detail, errors: None, conflicting_exam_id: None }
    }
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    Validation(validator::ValidationErrors),
    NotFound(String),
    Conflict(String),
    RoomConflict { detail: String, exam_id: String },
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let status = StatusCode::UNAUTHORIZED;
                let mut response =
                    (status, Json(ErrorResponse::new(status, message.to_string()))).into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Forbidden(message) => {
                let status = StatusCode::FORBIDDEN;
                (status, Json(ErrorResponse::new(status, message.to_string()))).into_response()
            }
            ApiError::BadRequest(message) => {
                let status = StatusCode::BAD_REQUEST;
                (status, Json(ErrorResponse::new(status, message))).into_response()
            }
            ApiError::Validation(errors) => {
                let status = StatusCode::UNPROCESSABLE_ENTITY;
                let body = ErrorResponse {
                    status: status.as_u16(),
                    detail: "Validation failed".to_string(),
                    errors: serde_json::to_value(&errors).ok(),
                    conflicting_exam_id: None,
                };
                (status, Json(body)).into_response()
            }
            ApiError::NotFound(message) => {
                let status = StatusCode::NOT_FOUND;
                (status, Json(ErrorResponse::new(status, message))).into_response()
            }
            ApiError::Conflict(message) => {
                let status = StatusCode::CONFLICT;
                (status, Json(ErrorResponse::new(status, message))).into_response()
            }
            ApiError::RoomConflict { detail, exam_id } => {
                let status = StatusCode::CONFLICT;
                let body = ErrorResponse {
                    status: status.as_u16(),
                    detail,
                    errors: None,
                    conflicting_exam_id: Some(exam_id),
                };
                (status, Json(body)).into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, Json(ErrorResponse::new(status, message))).into_response()
            }
        }
    }
}
