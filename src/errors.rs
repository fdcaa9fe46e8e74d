use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Input rejected before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid file format `{0}`. Upload a JPG, PNG, GIF, or WEBP.")]
    InvalidFormat(String),
    #[error("File size must be less than 5MB (got {size} bytes).")]
    TooLarge { size: u64 },
    #[error("Please select a file to upload.")]
    NoFileSelected,
    #[error("Album name must not be empty.")]
    EmptyAlbumName,
    #[error("Select at least one photo to delete.")]
    EmptySelection,
    #[error("Enter a valid email address.")]
    InvalidEmail,
    #[error("Password must be at least {min} characters.")]
    ShortPassword { min: usize },
}

/// Failure reported by one of the backend boundaries. The message is the
/// backend's own, passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("{0}")]
    Record(String),
    #[error("{0}")]
    Object(String),
    #[error("{0}")]
    Auth(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Every failure a view action can run into.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlbumError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("You must be logged in to {action}")]
    AuthRequired { action: &'static str },
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl AlbumError {
    pub fn auth_required(action: &'static str) -> Self {
        Self::AuthRequired { action }
    }
}

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<AlbumError> for AppError {
    fn from(err: AlbumError) -> Self {
        let status = match &err {
            AlbumError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AlbumError::AuthRequired { .. } => StatusCode::UNAUTHORIZED,
            AlbumError::Remote(_) => StatusCode::BAD_GATEWAY,
        };
        AppError::new(status, err.to_string())
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AlbumError::from(err).into()
    }
}

impl From<RemoteError> for AppError {
    fn from(err: RemoteError) -> Self {
        AlbumError::from(err).into()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}
