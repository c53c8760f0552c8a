//! Ingestion pipeline error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Validation failed: {message}")]
    Validation { message: String, field: Option<String> },

    #[error("A submission is already in flight")]
    SubmissionInFlight,

    /// The single fatal step: the persistence call itself failed.
    /// Carries the underlying message verbatim for the user.
    #[error("Failed to save story: {message}")]
    Persistence { message: String },
}

impl From<mosaic_common::errors::AppError> for IngestionError {
    fn from(e: mosaic_common::errors::AppError) -> Self {
        IngestionError::Persistence {
            message: e.details().unwrap_or_else(|| e.to_string()),
        }
    }
}

impl From<IngestionError> for mosaic_common::errors::AppError {
    fn from(e: IngestionError) -> Self {
        use mosaic_common::errors::AppError;

        match e {
            IngestionError::Validation { message, field } => {
                AppError::Validation { message, field }
            }
            IngestionError::SubmissionInFlight => AppError::SubmissionInFlight,
            IngestionError::Persistence { message } => AppError::Internal { message },
        }
    }
}
