//! Transient story draft model
//!
//! Owned by one upload form session: created empty, mutated field by
//! field, consumed exactly once by the orchestrator. On a fatal failure
//! the caller keeps the draft so the user can resubmit.

use crate::errors::IngestionError;
use mosaic_common::geocode::Coordinates;
use serde::{Deserialize, Serialize};

/// How the story is being contributed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadMode {
    Audio,
    Text,
    File,
}

impl UploadMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadMode::Audio => "audio",
            UploadMode::Text => "text",
            UploadMode::File => "file",
        }
    }
}

/// Kind of binary asset attached to a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Audio,
    Document,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Audio => "audio",
            AssetKind::Document => "document",
        }
    }
}

/// A binary asset selected on the form
#[derive(Debug, Clone)]
pub struct AssetSelection {
    pub kind: AssetKind,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// The upload form state at submission time
#[derive(Debug, Clone, Default)]
pub struct StoryDraft {
    pub title: String,
    pub storyteller: Option<String>,
    pub culture: Option<String>,
    /// Present only for the text input mode
    pub body_text: Option<String>,
    pub upload_mode: Option<UploadMode>,
    /// Comma-separated free text, parsed during assembly
    pub tags_raw: String,
    pub city: String,
    pub country: String,
    /// Pre-resolved coordinates, when the form already knows them
    pub coordinates: Option<Coordinates>,
    /// Theme color choice; assembly falls back to the default palette entry
    pub color: Option<String>,
    pub image: Option<AssetSelection>,
    pub audio: Option<AssetSelection>,
    pub document: Option<AssetSelection>,
}

impl StoryDraft {
    /// The effective upload mode (audio when the form never picked one,
    /// matching the form's initial tab)
    pub fn mode(&self) -> UploadMode {
        self.upload_mode.unwrap_or(UploadMode::Audio)
    }

    /// Check the required fields before any external call is made
    pub fn validate(&self) -> Result<(), IngestionError> {
        if self.title.trim().is_empty() {
            return Err(IngestionError::Validation {
                message: "Story title is required".to_string(),
                field: Some("title".to_string()),
            });
        }

        if self.mode() == UploadMode::Text
            && self
                .body_text
                .as_deref()
                .map(|t| t.trim().is_empty())
                .unwrap_or(true)
        {
            return Err(IngestionError::Validation {
                message: "Story text is required for text submissions".to_string(),
                field: Some("body_text".to_string()),
            });
        }

        Ok(())
    }

    /// The attached assets in a fixed order (image, audio, document)
    pub fn assets(&self) -> [&Option<AssetSelection>; 3] {
        [&self.image, &self.audio, &self.document]
    }
}
