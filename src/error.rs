//! Error types for the home library server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::enums::{LendingStatus, TransactionKind};

/// Stable numeric error codes returned to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    InvalidKey = 2,
    UnknownItem = 3,
    DuplicateItem = 4,
    InvalidTransition = 5,
    PersistenceFailure = 6,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid item key: {0}")]
    InvalidKey(String),

    #[error("Item {0} is not in the library")]
    UnknownItem(String),

    #[error("Item {0} is already in the library")]
    DuplicateItem(String),

    #[error("Cannot {requested} item {isbn} while it is {status}")]
    InvalidTransition {
        isbn: String,
        status: LendingStatus,
        requested: TransactionKind,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl AppError {
    /// Only persistence failures may be retried verbatim; everything else is a
    /// client input error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Persistence(_))
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::InvalidKey(_) => ErrorCode::InvalidKey,
            AppError::UnknownItem(_) => ErrorCode::UnknownItem,
            AppError::DuplicateItem(_) => ErrorCode::DuplicateItem,
            AppError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            AppError::Persistence(_) => ErrorCode::PersistenceFailure,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Persistence(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Persistence(format!("snapshot encoding: {}", e))
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    pub retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            AppError::UnknownItem(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateItem(_) | AppError::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
            AppError::Persistence(msg) => {
                tracing::error!("Persistence error: {}", msg);
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        let code = self.code();
        let message = match &self {
            AppError::Persistence(_) => "Storage is unavailable, please retry".to_string(),
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
            retryable: self.is_retryable(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
