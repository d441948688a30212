use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use storecraft_core::ServiceError;

#[derive(Debug)]
pub struct ApiError {
    code: &'static str,
    message: String,
    status: StatusCode,
}

impl ApiError {
    pub fn new(code: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new("Unauthorized", StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn unauthorized_with_message(message: impl Into<String>) -> Self {
        Self::new("Unauthorized", StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("Forbidden", StatusCode::FORBIDDEN, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BadRequest", StatusCode::BAD_REQUEST, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new("TooManyRequests", StatusCode::TOO_MANY_REQUESTS, message)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(what) => {
                ApiError::new("NotFound", StatusCode::NOT_FOUND, format!("{what} not found"))
            }
            ServiceError::DuplicateEmail(_) => ApiError::new(
                "DuplicateEmail",
                StatusCode::BAD_REQUEST,
                "user already exists",
            ),
            ServiceError::InvalidCredentials => ApiError::new(
                "InvalidCredentials",
                StatusCode::BAD_REQUEST,
                "email or password is incorrect",
            ),
            ServiceError::NoTokenOutstanding => ApiError::new(
                "NoTokenOutstanding",
                StatusCode::BAD_REQUEST,
                "no verification outstanding",
            ),
            ServiceError::InvalidToken => {
                ApiError::new("InvalidToken", StatusCode::BAD_REQUEST, "invalid token")
            }
            ServiceError::Expired => {
                ApiError::new("Expired", StatusCode::UNAUTHORIZED, "token expired")
            }
            ServiceError::InvalidOrExpiredToken => ApiError::new(
                "InvalidOrExpiredToken",
                StatusCode::BAD_REQUEST,
                "invalid or expired link",
            ),
            ServiceError::ResetAlreadyPending => ApiError::new(
                "ResetAlreadyPending",
                StatusCode::BAD_REQUEST,
                "a password reset is already pending",
            ),
            ServiceError::AdminProtected => ApiError::new(
                "AdminProtected",
                StatusCode::CONFLICT,
                "admin accounts cannot be deleted",
            ),
            ServiceError::Unauthorized(msg) => {
                ApiError::new("Unauthorized", StatusCode::UNAUTHORIZED, msg)
            }
            ServiceError::Forbidden(msg) => {
                ApiError::new("Forbidden", StatusCode::FORBIDDEN, msg)
            }
            ServiceError::Validation(msg) => {
                ApiError::new("ValidationError", StatusCode::BAD_REQUEST, msg)
            }
            ServiceError::Io(e) => {
                ApiError::new("IoError", StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ServiceError::Serde(e) => {
                ApiError::new("SerdeError", StatusCode::BAD_REQUEST, e.to_string())
            }
            ServiceError::Other(msg) => {
                ApiError::new("Error", StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "code": self.code,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}
