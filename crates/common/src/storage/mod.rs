//! Object storage adapter for story assets
//!
//! Provides a unified interface over the hosted storage service plus the
//! upload policy for story assets: collision-resistant keys, per-kind
//! buckets, and absorb-and-log failure handling. A failed upload never
//! aborts a submission; the matching locator simply stays empty.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, warn};

/// Trait for the object storage backend
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload raw bytes under the given bucket and key
    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Durable public retrieval locator for a stored object
    fn public_url(&self, bucket: &str, key: &str) -> String;
}

/// Storage client speaking the Supabase storage REST API
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: String, service_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        }
    }
}

#[async_trait]
impl ObjectStore for SupabaseStore {
    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        let url = format!("{}/object/{}/{}", self.base_url, bucket, key);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal {
                message: format!("Storage upload failed ({}): {}", status, body),
            });
        }

        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/object/public/{}/{}", self.base_url, bucket, key)
    }
}

/// In-memory store for tests, with per-bucket failure injection
#[derive(Default)]
pub struct MockStore {
    objects: tokio::sync::Mutex<Vec<(String, String, Vec<u8>)>>,
    failing_buckets: Vec<String>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All uploads to these buckets will fail
    pub fn failing(buckets: &[&str]) -> Self {
        Self {
            objects: tokio::sync::Mutex::new(Vec::new()),
            failing_buckets: buckets.iter().map(|b| b.to_string()).collect(),
        }
    }

    pub async fn stored_count(&self) -> usize {
        self.objects.lock().await.len()
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        if self.failing_buckets.iter().any(|b| b == bucket) {
            return Err(AppError::Internal {
                message: format!("injected failure for bucket {}", bucket),
            });
        }

        self.objects
            .lock()
            .await
            .push((bucket.to_string(), key.to_string(), bytes));
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("mock://{}/{}", bucket, key)
    }
}

/// Uploads story assets and converts failures into absent locators
pub struct AssetUploader {
    store: Arc<dyn ObjectStore>,
}

impl AssetUploader {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Upload one asset to the given bucket.
    ///
    /// Returns the public locator on success, or `None` after logging a
    /// warning on any failure. The original filename only contributes its
    /// extension; the storage key is derived from the upload time plus a
    /// random suffix so concurrent uploads cannot collide.
    pub async fn upload(&self, bucket: &str, filename: &str, bytes: Vec<u8>) -> Option<String> {
        let key = derive_key(filename);

        match self.store.upload(bucket, &key, bytes).await {
            Ok(()) => {
                let url = self.store.public_url(bucket, &key);
                debug!(bucket, key = %key, "Asset uploaded");
                Some(url)
            }
            Err(e) => {
                warn!(bucket, filename, error = %e, "Asset upload failed, continuing without it");
                None
            }
        }
    }
}

/// Derive a collision-resistant storage key, keeping only the extension
/// from the original filename
fn derive_key(filename: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);

    match filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => format!("{}-{:06}.{}", millis, suffix, ext),
        _ => format!("{}-{:06}", millis, suffix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_keeps_extension_only() {
        let key = derive_key("grandmother's recipe.mp3");
        assert!(key.ends_with(".mp3"));
        assert!(!key.contains("recipe"));
    }

    #[test]
    fn test_key_without_extension() {
        let key = derive_key("README");
        assert!(!key.contains('.'));
    }

    #[tokio::test]
    async fn test_upload_success_returns_locator() {
        let store = Arc::new(MockStore::new());
        let uploader = AssetUploader::new(store.clone());

        let url = uploader.upload("story-images", "photo.png", vec![1, 2, 3]).await;

        let url = url.expect("upload should succeed");
        assert!(url.starts_with("mock://story-images/"));
        assert!(url.ends_with(".png"));
        assert_eq!(store.stored_count().await, 1);
    }

    #[tokio::test]
    async fn test_upload_failure_is_absorbed() {
        let store = Arc::new(MockStore::failing(&["story-audio"]));
        let uploader = AssetUploader::new(store.clone());

        let url = uploader.upload("story-audio", "tale.wav", vec![0; 16]).await;

        assert!(url.is_none());
        assert_eq!(store.stored_count().await, 0);
    }
}
