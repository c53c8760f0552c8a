//! Curriculum generation handler
//!
//! Server-mediated flow: the client sends the story fields it already
//! has, the gateway generates the curriculum and persists it on the
//! story row, and the client receives the finished text. Error bodies
//! follow the flat `{error, details?}` contract.

use crate::extract::AppJson;
use crate::AppState;
use axum::{extract::State, Json};
use mosaic_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCurriculumRequest {
    /// Opaque story identifier, applied downstream as a last-write-wins
    /// update key
    #[serde(default)]
    pub story_id: String,
    #[serde(default)]
    pub title: String,
    /// Story excerpt used as generation context
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub culture: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateCurriculumResponse {
    pub success: bool,
    pub curriculum: String,
    pub message: String,
}

/// Generate a curriculum for an existing story and persist it
pub async fn generate(
    State(state): State<AppState>,
    AppJson(request): AppJson<GenerateCurriculumRequest>,
) -> Result<Json<GenerateCurriculumResponse>> {
    let mut missing = Vec::new();
    if request.story_id.trim().is_empty() {
        missing.push("storyId".to_string());
    }
    if request.title.trim().is_empty() {
        missing.push("title".to_string());
    }
    if request.excerpt.trim().is_empty() {
        missing.push("excerpt".to_string());
    }
    if request.culture.trim().is_empty() {
        missing.push("culture".to_string());
    }
    if !missing.is_empty() {
        return Err(AppError::MissingFields { fields: missing });
    }

    let service = state
        .curriculum
        .as_ref()
        .ok_or_else(|| AppError::Configuration {
            message: "generation API key is not configured".to_string(),
        })?;

    let curriculum = service
        .generate_and_store(
            request.story_id.trim(),
            &request.title,
            &request.excerpt,
            &request.culture,
        )
        .await?;

    Ok(Json(GenerateCurriculumResponse {
        success: true,
        curriculum,
        message: "Curriculum generated and saved successfully".to_string(),
    }))
}
