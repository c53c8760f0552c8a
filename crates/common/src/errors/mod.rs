//! Error types for Mosaic services
//!
//! Provides:
//! - Distinct error types for the ingestion and generation flows
//! - HTTP status code mapping
//! - Structured `{error, details?}` responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Missing required fields")]
    MissingFields { fields: Vec<String> },

    #[error("Invalid request body")]
    InvalidBody { message: String },

    // Resource errors
    #[error("Story not found: {id}")]
    StoryNotFound { id: String },

    // Concurrency guards
    #[error("A submission is already in flight")]
    SubmissionInFlight,

    #[error("Curriculum generation already in progress for story {id}")]
    GenerationInFlight { id: String },

    // Database errors
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error")]
    DatabaseConnection { message: String },

    #[error("Database update failed")]
    DatabaseUpdate { message: String },

    // External service errors
    #[error("Failed to generate curriculum")]
    CurriculumGeneration { message: String },

    #[error("Upstream request failed")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error")]
    Internal { message: String },

    #[error("API configuration error")]
    Configuration { message: String },

    #[error("Serialization error")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::MissingFields { .. }
            | AppError::InvalidBody { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::StoryNotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::SubmissionInFlight | AppError::GenerationInFlight { .. } => {
                StatusCode::CONFLICT
            }

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::DatabaseUpdate { .. }
            | AppError::CurriculumGeneration { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Underlying detail message, when one exists beyond the summary
    pub fn details(&self) -> Option<String> {
        match self {
            AppError::Validation { message, .. } => Some(message.clone()),
            AppError::MissingFields { fields } => Some(fields.join(", ")),
            AppError::InvalidBody { message } => Some(message.clone()),
            AppError::Database(e) => Some(e.to_string()),
            AppError::DatabaseConnection { message }
            | AppError::DatabaseUpdate { message }
            | AppError::CurriculumGeneration { message }
            | AppError::Internal { message }
            | AppError::Configuration { message } => Some(message.clone()),
            AppError::HttpClient(e) => Some(e.to_string()),
            AppError::Serialization(e) => Some(e.to_string()),
            AppError::Other(e) => Some(e.to_string()),
            AppError::StoryNotFound { .. }
            | AppError::SubmissionInFlight
            | AppError::GenerationInFlight { .. } => None,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for the API: `{error, details?}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        let details = self.details();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                details = ?details,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                details = ?details,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

// Any body that cannot be deserialized into the request type is one
// client error: a 400 with the flat contract body, not the framework's
// default rejection.
impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::InvalidBody {
            message: rejection.body_text(),
        }
    }
}
