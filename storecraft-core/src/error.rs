use thiserror::Error;

/// Common result type for core operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("email already registered: {0}")]
    DuplicateEmail(String),
    #[error("email or password is incorrect")]
    InvalidCredentials,
    #[error("no verification outstanding")]
    NoTokenOutstanding,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    Expired,
    #[error("invalid or expired link")]
    InvalidOrExpiredToken,
    #[error("a password reset is already pending")]
    ResetAlreadyPending,
    #[error("admin accounts cannot be deleted")]
    AdminProtected,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("other error: {0}")]
    Other(String),
}
