//! Story submission and retrieval handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::extract::AppJson;
use crate::AppState;
use mosaic_common::{
    db::{models::Story, Repository},
    errors::{AppError, Result},
    geocode::Coordinates,
};
use mosaic_ingestion::{AssetKind, AssetSelection, StoryDraft, UploadMode};

/// Request to submit a new story
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitStoryRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,

    #[serde(default)]
    pub storyteller: Option<String>,

    #[serde(default)]
    pub culture: Option<String>,

    /// Story body, for the text upload mode
    #[serde(default)]
    pub story_text: Option<String>,

    #[serde(default)]
    pub upload_mode: Option<UploadMode>,

    /// Comma-separated free text
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub tags: String,

    #[serde(default)]
    pub city: String,

    #[serde(default)]
    pub country: String,

    /// Pre-resolved coordinates from the form's debounced lookup
    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub longitude: Option<f64>,

    #[serde(default)]
    pub color: Option<String>,

    #[serde(default)]
    pub image: Option<AssetUpload>,

    #[serde(default)]
    pub audio: Option<AssetUpload>,

    #[serde(default)]
    pub document: Option<AssetUpload>,
}

/// A binary asset carried inline in the request
#[derive(Debug, Deserialize)]
pub struct AssetUpload {
    pub filename: String,
    /// Base64-encoded content
    pub data: String,
}

impl SubmitStoryRequest {
    fn into_draft(self) -> Result<StoryDraft> {
        let coordinates = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        };

        Ok(StoryDraft {
            title: self.title,
            storyteller: self.storyteller,
            culture: self.culture,
            body_text: self.story_text,
            upload_mode: self.upload_mode,
            tags_raw: self.tags,
            city: self.city,
            country: self.country,
            coordinates,
            color: self.color,
            image: decode_asset(self.image, AssetKind::Image)?,
            audio: decode_asset(self.audio, AssetKind::Audio)?,
            document: decode_asset(self.document, AssetKind::Document)?,
        })
    }
}

fn decode_asset(asset: Option<AssetUpload>, kind: AssetKind) -> Result<Option<AssetSelection>> {
    let Some(asset) = asset else {
        return Ok(None);
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(asset.data.as_bytes())
        .map_err(|_| AppError::InvalidBody {
            message: format!("{} asset is not valid base64", kind.as_str()),
        })?;

    Ok(Some(AssetSelection {
        kind,
        filename: asset.filename,
        bytes,
    }))
}

/// API view of a story record
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryResponse {
    pub id: Uuid,
    pub title: String,
    pub storyteller: Option<String>,
    pub culture: Option<String>,
    pub hometown: Option<String>,
    pub country: Option<String>,
    pub tags: serde_json::Value,
    pub story_type: String,
    pub color: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub document_url: Option<String>,
    pub excerpt: String,
    pub curriculum: Option<String>,
    pub created_at: String,
}

impl From<Story> for StoryResponse {
    fn from(story: Story) -> Self {
        Self {
            id: story.id,
            title: story.title,
            storyteller: story.storyteller,
            culture: story.culture,
            hometown: story.hometown,
            country: story.country,
            tags: story.tags,
            story_type: story.story_type,
            color: story.color,
            latitude: story.latitude,
            longitude: story.longitude,
            image_url: story.image_url,
            audio_url: story.audio_url,
            document_url: story.document_url,
            excerpt: story.excerpt,
            curriculum: story.curriculum,
            created_at: story.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StoryListResponse {
    pub total: u64,
    pub stories: Vec<StoryResponse>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub offset: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    50
}

/// Submit a new story through the ingestion pipeline
pub async fn submit_story(
    State(state): State<AppState>,
    AppJson(request): AppJson<SubmitStoryRequest>,
) -> Result<(StatusCode, Json<StoryResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let draft = request.into_draft()?;
    let story = state.ingestion.submit(draft).await.map_err(AppError::from)?;

    Ok((StatusCode::CREATED, Json(story.into())))
}

/// Fetch a single story
pub async fn get_story(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StoryResponse>> {
    let story = state
        .store
        .find_story_by_id(id)
        .await?
        .ok_or_else(|| AppError::StoryNotFound { id: id.to_string() })?;

    Ok(Json(story.into()))
}

/// List stories, newest first
pub async fn list_stories(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<StoryListResponse>> {
    let repo = Repository::new(state.db.clone());
    let (stories, total) = repo
        .list_stories(query.offset, query.limit.clamp(1, 200))
        .await?;

    Ok(Json(StoryListResponse {
        total,
        stories: stories.into_iter().map(Into::into).collect(),
    }))
}

/// Delete a story
pub async fn delete_story(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let repo = Repository::new(state.db.clone());

    if repo.delete_story(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::StoryNotFound { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{app_state, app_state_with_objects, sample_story};
    use base64::engine::general_purpose::STANDARD;
    use mosaic_common::db::MemoryStoryStore;
    use mosaic_common::storage::MockStore;
    use std::sync::Arc;

    fn request() -> SubmitStoryRequest {
        SubmitStoryRequest {
            title: "The Salt Road".to_string(),
            storyteller: Some("Aminata".to_string()),
            culture: Some("Songhai".to_string()),
            story_text: Some("Caravans carried salt and stories...".to_string()),
            upload_mode: Some(UploadMode::Text),
            tags: "Trade, Migration".to_string(),
            city: "Timbuktu".to_string(),
            country: "Mali".to_string(),
            latitude: None,
            longitude: None,
            color: Some("ocean".to_string()),
            image: None,
            audio: None,
            document: None,
        }
    }

    #[tokio::test]
    async fn test_submit_returns_created_story() {
        let store = Arc::new(MemoryStoryStore::new());
        let state = app_state(store.clone(), None);

        let (status, Json(body)) = submit_story(State(state), AppJson(request())).await.unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.title, "The Salt Road");
        assert_eq!(body.story_type, "text");
        assert_eq!(body.color, "ocean");
        assert_eq!(body.tags, serde_json::json!(["Trade", "Migration"]));
        assert_eq!(store.story_count().await, 1);
    }

    #[tokio::test]
    async fn test_submit_with_asset_stores_locator() {
        let store = Arc::new(MemoryStoryStore::new());
        let state = app_state(store, None);

        let mut req = request();
        req.image = Some(AssetUpload {
            filename: "photo.png".to_string(),
            data: STANDARD.encode([1u8, 2, 3]),
        });

        let (_, Json(body)) = submit_story(State(state), AppJson(req)).await.unwrap();
        assert!(body.image_url.is_some());
    }

    #[tokio::test]
    async fn test_failed_asset_upload_leaves_field_null() {
        let store = Arc::new(MemoryStoryStore::new());
        let state = app_state_with_objects(store.clone(), MockStore::failing(&["story-images"]));

        let mut req = request();
        req.image = Some(AssetUpload {
            filename: "photo.png".to_string(),
            data: STANDARD.encode([1u8, 2, 3]),
        });

        let (status, Json(body)) = submit_story(State(state), AppJson(req)).await.unwrap();

        // the submission still persists; only the locator is absent
        assert_eq!(status, StatusCode::CREATED);
        assert!(body.image_url.is_none());
        assert_eq!(store.story_count().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_base64_rejected() {
        let state = app_state(Arc::new(MemoryStoryStore::new()), None);

        let mut req = request();
        req.audio = Some(AssetUpload {
            filename: "tale.wav".to_string(),
            data: "not//valid==base64!!".to_string(),
        });

        let err = submit_story(State(state), AppJson(req)).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(matches!(err, AppError::InvalidBody { .. }));
    }

    #[tokio::test]
    async fn test_missing_title_rejected() {
        let state = app_state(Arc::new(MemoryStoryStore::new()), None);

        let mut req = request();
        req.title = String::new();

        let err = submit_story(State(state), AppJson(req)).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_story_found_and_missing() {
        let id = Uuid::new_v4();
        let store = Arc::new(MemoryStoryStore::new());
        store.seed(sample_story(id)).await;
        let state = app_state(store, None);

        let Json(body) = get_story(State(state.clone()), Path(id)).await.unwrap();
        assert_eq!(body.id, id);

        let err = get_story(State(state), Path(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
