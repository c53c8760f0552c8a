//! Configuration management for Mosaic services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Object storage configuration (story assets)
    pub storage: StorageConfig,

    /// Geocoding service configuration
    pub geocoding: GeocodingConfig,

    /// Curriculum generation service configuration
    pub generation: GenerationConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Storage API base URL, e.g. https://<project>.supabase.co/storage/v1
    pub base_url: Option<String>,

    /// Service key sent as a bearer token
    pub service_key: Option<String>,

    /// Bucket for story images
    #[serde(default = "default_image_bucket")]
    pub image_bucket: String,

    /// Bucket for story audio recordings
    #[serde(default = "default_audio_bucket")]
    pub audio_bucket: String,

    /// Bucket for story documents
    #[serde(default = "default_document_bucket")]
    pub document_bucket: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeocodingConfig {
    /// Geocoding API base URL (Nominatim wire format)
    #[serde(default = "default_geocoding_base")]
    pub base_url: String,

    /// User-Agent header required by public Nominatim instances
    #[serde(default = "default_geocoding_agent")]
    pub user_agent: String,

    /// Debounce window for live form edits, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// API key for the generation service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Maximum output tokens per generation
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_image_bucket() -> String { "story-images".to_string() }
fn default_audio_bucket() -> String { "story-audio".to_string() }
fn default_document_bucket() -> String { "story-documents".to_string() }
fn default_geocoding_base() -> String { "https://nominatim.openstreetmap.org".to_string() }
fn default_geocoding_agent() -> String { "mosaic-stories".to_string() }
fn default_debounce_ms() -> u64 { 1000 }
fn default_generation_model() -> String { crate::DEFAULT_GENERATION_MODEL.to_string() }
fn default_max_tokens() -> u32 { crate::DEFAULT_MAX_OUTPUT_TOKENS }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "mosaic".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get the debounce window as Duration
    pub fn geocode_debounce(&self) -> Duration {
        Duration::from_millis(self.geocoding.debounce_ms)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }
}

impl StorageConfig {
    /// Bucket name for an asset kind label ("image", "audio", "document")
    pub fn bucket_for(&self, kind: &str) -> Option<&str> {
        match kind {
            "image" => Some(&self.image_bucket),
            "audio" => Some(&self.audio_bucket),
            "document" => Some(&self.document_bucket),
            _ => None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                shutdown_timeout_secs: default_shutdown_timeout(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/mosaic".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            storage: StorageConfig {
                base_url: None,
                service_key: None,
                image_bucket: default_image_bucket(),
                audio_bucket: default_audio_bucket(),
                document_bucket: default_document_bucket(),
            },
            geocoding: GeocodingConfig {
                base_url: default_geocoding_base(),
                user_agent: default_geocoding_agent(),
                debounce_ms: default_debounce_ms(),
            },
            generation: GenerationConfig {
                api_key: None,
                api_base: None,
                model: default_generation_model(),
                max_tokens: default_max_tokens(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                metrics_port: default_metrics_port(),
                service_name: default_service_name(),
            },
        }
    }
}
