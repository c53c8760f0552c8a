//! Story entity
//!
//! One row per ingested story. Coordinates are both null or both set;
//! locators stay null when the matching asset upload failed or was never
//! attempted. `curriculum` is plain text, set after generation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub storyteller: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub culture: Option<String>,

    /// City entered on the upload form
    #[sea_orm(column_type = "Text", nullable)]
    pub hometown: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub country: Option<String>,

    /// Ordered tag list as a JSONB array of strings
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: serde_json::Value,

    /// Upload mode: "audio", "text", or "file"
    #[sea_orm(column_type = "Text")]
    pub story_type: String,

    /// Theme tag from the fixed palette
    #[sea_orm(column_type = "Text")]
    pub color: String,

    pub latitude: Option<f64>,

    pub longitude: Option<f64>,

    #[sea_orm(column_type = "Text", nullable)]
    pub image_url: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub audio_url: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub document_url: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub excerpt: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub curriculum: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Tags as an owned string list (empty when the column holds anything
    /// other than an array)
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
