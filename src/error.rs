//! Error types shared by the stores and the HTTP layer.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::routes::ErrorResponse;

/// Everything a request can fail with. Each variant maps to one status code,
/// except `Rejected`, which keeps the status of the body it refused.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(entity: &str) -> Self {
        Self::NotFound(format!("{} not found", entity))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Rejected { status, .. } => *status,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True when the storage engine rejected a write on a UNIQUE constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            AppError::Storage(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }

    /// Map a failed write to `Conflict` when it hit a UNIQUE constraint.
    pub fn from_write(err: sqlx::Error, conflict: &str) -> Self {
        let err = AppError::Storage(err);
        if err.is_unique_violation() {
            AppError::Conflict(conflict.to_string())
        } else {
            err
        }
    }
}

/// Malformed or mistyped JSON is a 400. Anything else (oversized body,
/// missing content type) keeps its own status.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let message = format!("Invalid JSON body: {}", rejection.body_text());
        match rejection {
            JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                AppError::Validation(message)
            }
            other => AppError::Rejected {
                status: other.status(),
                message,
            },
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            // Storage details only go to the logs.
            AppError::Storage(e) => {
                tracing::error!(error = %e, "database error");
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(ErrorResponse {
                error,
                message: None,
            }),
        )
            .into_response()
    }
}

/// Failures that stop the server from booting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("database setup failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("seeding failed: {0}")]
    Seed(#[from] AppError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
