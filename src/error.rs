use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug)]
pub enum AppError {
    WrongMethod,
    MissingFileField,
    InvalidFilename(String),
    Multipart(String),
    Io(std::io::Error),
    ConfigWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::WrongMethod => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Invalid request method.".to_string(),
            ),
            AppError::MissingFileField => (
                StatusCode::BAD_REQUEST,
                "Please upload using multipart/form-data, make sure the key is `file`.".to_string(),
            ),
            AppError::InvalidFilename(name) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid upload filename: {}", name),
            ),
            AppError::Multipart(message) => (
                StatusCode::BAD_REQUEST,
                format!("Malformed upload: {}", message),
            ),
            AppError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (StatusCode::NOT_FOUND, "File not found.".to_string())
            }
            AppError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            // Startup-only; never produced by a request handler.
            AppError::ConfigWrite { .. } => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        (status, message).into_response()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::WrongMethod => write!(f, "invalid request method"),
            AppError::MissingFileField => write!(f, "missing multipart field `file`"),
            AppError::InvalidFilename(name) => write!(f, "invalid upload filename: {}", name),
            AppError::Multipart(message) => write!(f, "malformed upload: {}", message),
            AppError::Io(e) => write!(f, "I/O error: {}", e),
            AppError::ConfigWrite { path, source } => {
                write!(f, "could not write config to {}: {}", path.display(), source)
            }
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e)
    }
}
