//! Story record assembly
//!
//! Pure data shaping: merges the draft, the geocode outcome, and the
//! asset upload outcomes into one persistable record. No I/O happens
//! here, which is what makes the record shape testable independent of
//! network behavior.

use crate::draft::{StoryDraft, UploadMode};
use mosaic_common::db::models::Story;
use mosaic_common::geocode::Coordinates;
use mosaic_common::{DEFAULT_STORY_COLOR, EXCERPT_MAX_CHARS, STORY_COLORS};
use uuid::Uuid;

/// Locators for the assets that made it to storage. `None` means the
/// upload failed or was never attempted; the record field stays null.
#[derive(Debug, Clone, Default)]
pub struct UploadOutcomes {
    pub image: Option<String>,
    pub audio: Option<String>,
    pub document: Option<String>,
}

/// Assemble a persistable story record, generating its identifier and
/// timestamp
pub fn assemble(draft: &StoryDraft, geocode: Option<Coordinates>, uploads: UploadOutcomes) -> Story {
    assemble_with(draft, geocode, uploads, Uuid::new_v4(), chrono::Utc::now().into())
}

/// Deterministic core of [`assemble`]: identifier and timestamp are
/// supplied by the caller
pub fn assemble_with(
    draft: &StoryDraft,
    geocode: Option<Coordinates>,
    uploads: UploadOutcomes,
    id: Uuid,
    created_at: chrono::DateTime<chrono::FixedOffset>,
) -> Story {
    let coordinates = draft.coordinates.or(geocode);

    Story {
        id,
        title: draft.title.trim().to_string(),
        storyteller: normalize(draft.storyteller.as_deref()),
        culture: normalize(draft.culture.as_deref()),
        hometown: normalize(Some(&draft.city)),
        country: normalize(Some(&draft.country)),
        tags: serde_json::json!(parse_tags(&draft.tags_raw)),
        story_type: draft.mode().as_str().to_string(),
        color: pick_color(draft.color.as_deref()),
        latitude: coordinates.map(|c| c.latitude),
        longitude: coordinates.map(|c| c.longitude),
        image_url: uploads.image,
        audio_url: uploads.audio,
        document_url: uploads.document,
        excerpt: derive_excerpt(draft),
        curriculum: None,
        created_at,
    }
}

/// Split comma-separated free text into trimmed non-empty tags.
/// Order is kept and duplicates are permitted.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Derive the story excerpt: a clipped body for text submissions, a
/// synthesized one-liner otherwise
pub fn derive_excerpt(draft: &StoryDraft) -> String {
    match draft.mode() {
        UploadMode::Text => {
            let body = draft.body_text.as_deref().unwrap_or("").trim();
            clip(body, EXCERPT_MAX_CHARS)
        }
        UploadMode::Audio => format!("An audio recording of \"{}\"", draft.title.trim()),
        UploadMode::File => format!("An uploaded story file, \"{}\"", draft.title.trim()),
    }
}

/// Clip to at most `max` characters, ending with "..." when truncated
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }

    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

fn pick_color(choice: Option<&str>) -> String {
    match choice {
        Some(c) if STORY_COLORS.contains(&c) => c.to_string(),
        _ => DEFAULT_STORY_COLOR.to_string(),
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{AssetKind, AssetSelection};

    fn text_draft(body: &str) -> StoryDraft {
        StoryDraft {
            title: "X".to_string(),
            upload_mode: Some(UploadMode::Text),
            body_text: Some(body.to_string()),
            tags_raw: String::new(),
            ..StoryDraft::default()
        }
    }

    #[test]
    fn test_tag_parsing() {
        assert_eq!(
            parse_tags("Food, , Tradition,  Music"),
            vec!["Food", "Tradition", "Music"]
        );
        assert_eq!(parse_tags(""), Vec::<String>::new());
        assert_eq!(parse_tags(" , ,"), Vec::<String>::new());
        // duplicates are kept, order preserved
        assert_eq!(parse_tags("Music,Music"), vec!["Music", "Music"]);
    }

    #[test]
    fn test_excerpt_clips_long_body() {
        let body = "a".repeat(200);
        let draft = text_draft(&body);

        let excerpt = derive_excerpt(&draft);
        assert!(excerpt.chars().count() <= 150);
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn test_excerpt_keeps_short_body() {
        let draft = text_draft("A short tale.");
        assert_eq!(derive_excerpt(&draft), "A short tale.");
    }

    #[test]
    fn test_excerpt_synthesized_for_non_text() {
        let draft = StoryDraft {
            title: "X".to_string(),
            upload_mode: Some(UploadMode::Audio),
            ..StoryDraft::default()
        };

        let excerpt = derive_excerpt(&draft);
        assert!(!excerpt.contains('\n'));
        assert!(excerpt.contains("X"));
    }

    #[test]
    fn test_color_defaults() {
        assert_eq!(pick_color(None), "terra");
        assert_eq!(pick_color(Some("ocean")), "ocean");
        assert_eq!(pick_color(Some("chartreuse")), "terra");
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let mut draft = text_draft("Body of the tale.");
        draft.tags_raw = "Food, Tradition".to_string();
        draft.city = "Lagos".to_string();
        draft.country = "Nigeria".to_string();

        let id = Uuid::new_v4();
        let at = chrono::Utc::now().into();
        let geocode = Some(Coordinates {
            latitude: 6.5244,
            longitude: 3.3792,
        });

        let a = assemble_with(&draft, geocode, UploadOutcomes::default(), id, at);
        let b = assemble_with(&draft, geocode, UploadOutcomes::default(), id, at);
        assert_eq!(a, b);
    }

    #[test]
    fn test_asset_fields_independent() {
        let draft = text_draft("Body.");

        // every combination of upload success/failure
        for mask in 0..8u8 {
            let uploads = UploadOutcomes {
                image: (mask & 1 != 0).then(|| "u/i".to_string()),
                audio: (mask & 2 != 0).then(|| "u/a".to_string()),
                document: (mask & 4 != 0).then(|| "u/d".to_string()),
            };

            let story = assemble(&draft, None, uploads);
            assert_eq!(story.image_url.is_some(), mask & 1 != 0);
            assert_eq!(story.audio_url.is_some(), mask & 2 != 0);
            assert_eq!(story.document_url.is_some(), mask & 4 != 0);
        }
    }

    #[test]
    fn test_coordinates_paired() {
        let draft = text_draft("Body.");

        let story = assemble(&draft, None, UploadOutcomes::default());
        assert!(story.latitude.is_none() && story.longitude.is_none());

        let story = assemble(
            &draft,
            Some(Coordinates {
                latitude: 1.0,
                longitude: 2.0,
            }),
            UploadOutcomes::default(),
        );
        assert_eq!(story.latitude, Some(1.0));
        assert_eq!(story.longitude, Some(2.0));
    }

    #[test]
    fn test_draft_coordinates_win_over_geocode() {
        let mut draft = text_draft("Body.");
        draft.coordinates = Some(Coordinates {
            latitude: 9.0,
            longitude: 9.0,
        });

        let story = assemble(
            &draft,
            Some(Coordinates {
                latitude: 1.0,
                longitude: 2.0,
            }),
            UploadOutcomes::default(),
        );
        assert_eq!(story.latitude, Some(9.0));
    }

    #[test]
    fn test_empty_optionals_become_null() {
        let mut draft = text_draft("Body.");
        draft.storyteller = Some("  ".to_string());
        draft.culture = None;
        draft.city = String::new();

        let story = assemble(&draft, None, UploadOutcomes::default());
        assert!(story.storyteller.is_none());
        assert!(story.culture.is_none());
        assert!(story.hometown.is_none());
        assert!(story.curriculum.is_none());
    }

    #[test]
    fn test_assets_listed_in_order() {
        let mut draft = text_draft("Body.");
        draft.image = Some(AssetSelection {
            kind: AssetKind::Image,
            filename: "p.png".to_string(),
            bytes: vec![1],
        });

        let [image, audio, document] = draft.assets();
        assert!(image.is_some());
        assert!(audio.is_none());
        assert!(document.is_none());
    }
}
