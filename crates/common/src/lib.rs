//! Mosaic Common Library
//!
//! Shared code for the Mosaic story services including:
//! - Database models and repository pattern
//! - Object storage adapter for story assets
//! - Geocoding adapter (Nominatim wire format)
//! - Curriculum generation client and orchestrator
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod curriculum;
pub mod db;
pub mod errors;
pub mod generation;
pub mod geocode;
pub mod metrics;
pub mod storage;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::Repository;
pub use errors::{AppError, Result};
pub use generation::CurriculumGenerator;
pub use geocode::Geocoder;
pub use storage::ObjectStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default generation model
pub const DEFAULT_GENERATION_MODEL: &str = "claude-3-7-sonnet-20250219";

/// Output budget for a single curriculum generation
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1000;

/// Default story theme color
pub const DEFAULT_STORY_COLOR: &str = "terra";

/// Closed set of story theme colors
pub const STORY_COLORS: &[&str] = &["terra", "ocean", "forest", "amber", "ruby"];

/// Maximum excerpt length derived from a text-mode story body
pub const EXCERPT_MAX_CHARS: usize = 150;
