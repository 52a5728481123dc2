//! Unified error type for the escrow core.
//!
//! Every financial operation fails loudly with one of the kinds below and
//! aborts its enclosing transaction; nothing is retried or recovered inside
//! the core. The HTTP facade maps each kind to a status code and a JSON body
//! with a stable machine-readable code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Core error taxonomy.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("insufficient available balance: requested {requested}, available {available}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("insufficient held balance: requested {requested}, held {held}")]
    InsufficientHeldFunds { held: i64, requested: i64 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl CoreError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Unauthorized(_) => "UNAUTHORIZED",
            CoreError::Forbidden(_) => "FORBIDDEN",
            CoreError::InvalidState(_) => "INVALID_STATE",
            CoreError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            CoreError::InsufficientHeldFunds { .. } => "INSUFFICIENT_HELD_FUNDS",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
            CoreError::InvalidState(_) => StatusCode::CONFLICT,
            CoreError::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
            CoreError::InsufficientHeldFunds { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            CoreError::Conflict(_) => StatusCode::CONFLICT,
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        match &self {
            // A held-funds shortfall outside the ledger's own guards means the
            // order book and the ledger disagree about escrowed money.
            CoreError::InsufficientHeldFunds { .. } => {
                tracing::error!(error = %message, code = %error_code, "ledger/order desync detected");
            }
            CoreError::Database(_) => {
                tracing::error!(error = %message, code = %error_code, "server error occurred");
            }
            _ => {
                tracing::debug!(error = %message, code = %error_code, "client error occurred");
            }
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

// Convenience conversions from common error types

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => CoreError::NotFound("record not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                CoreError::Conflict("uniqueness constraint violated".to_string())
            }
            _ => CoreError::Database(err),
        }
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        CoreError::Validation(err.to_string())
    }
}

/// Result type alias using CoreError
pub type CoreResult<T> = Result<T, CoreError>;
