//! Mosaic story ingestion
//!
//! The pipeline that turns a user-entered story draft and its optional
//! assets into a persisted story record:
//! - [`draft`]: the transient form model and its validation
//! - [`assemble`]: pure record assembly (tags, excerpt, defaults)
//! - [`debounce`]: cancellable delayed geocoding for live form edits
//! - [`orchestrator`]: the submission state machine

pub mod assemble;
pub mod debounce;
pub mod draft;
pub mod errors;
pub mod orchestrator;

pub use debounce::{DebouncedGeocoder, GeocodeState};
pub use draft::{AssetKind, AssetSelection, StoryDraft, UploadMode};
pub use errors::IngestionError;
pub use orchestrator::{IngestionOrchestrator, SubmissionPhase, SubmissionProgress};
