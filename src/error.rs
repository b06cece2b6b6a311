// src/error.rs
use std::{collections::BTreeMap, fmt::Display};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{debug, error};

use crate::config::ConfigError;
use crate::models::ActionResponse;

/// Per-field validation messages, keyed by request field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Poll not found")]
    NotFound,

    #[error("Vote not found")]
    VoteNotFound,

    #[error("Invalid option")]
    InvalidOption,

    #[error("Already voted")]
    AlreadyVoted,

    #[error("Validation failed")]
    ValidationFailed(FieldErrors),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    /// A request part that could not be parsed at all. The parser's detail
    /// is logged, the client only learns which part was unreadable.
    pub fn malformed(field: &str, detail: impl Display) -> Self {
        debug!(field, %detail, "Rejected malformed request");

        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![format!("Malformed {field}")]);
        AppError::ValidationFailed(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound | AppError::VoteNotFound => StatusCode::NOT_FOUND,
            AppError::InvalidOption | AppError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AppError::AlreadyVoted => StatusCode::CONFLICT,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            AppError::Database(e) => {
                error!(error = %e, "Storage failure");
                ActionResponse::failure("Internal server error")
            }
            AppError::ValidationFailed(errors) => ActionResponse {
                success: false,
                message: "Validation failed".to_string(),
                errors: Some(errors),
            },
            other => ActionResponse::failure(other.to_string()),
        };

        (status, Json(body)).into_response()
    }
}

/// Errors that abort startup before the server accepts connections.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}
