//! Request extractors with contract-shaped rejections

use axum::extract::FromRequest;
use mosaic_common::errors::AppError;

/// JSON body extractor whose rejection is an [`AppError::InvalidBody`],
/// so malformed or mistyped bodies answer 400 with the flat
/// `{error, details?}` contract instead of the framework default.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
