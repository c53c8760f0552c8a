//! Submission orchestration
//!
//! Drives one story submission through an explicit state machine:
//!
//! ```text
//! Idle -> GeocodingPending -> UploadingAssets -> Assembling -> Persisting
//!      -> Succeeded | Failed
//! ```
//!
//! Geocoding and asset uploads are issued concurrently; both settle
//! before assembly. Geocoding misses and upload failures degrade the
//! record but never abort the flow. The persistence call is the single
//! fatal step, and its message reaches the caller verbatim. A second
//! submission is rejected while one is in flight.

use crate::assemble::{assemble, UploadOutcomes};
use crate::draft::{AssetSelection, StoryDraft};
use crate::errors::IngestionError;
use mosaic_common::config::StorageConfig;
use mosaic_common::db::models::Story;
use mosaic_common::db::StoryStore;
use mosaic_common::geocode::{Coordinates, Geocoder};
use mosaic_common::storage::{AssetUploader, ObjectStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

/// Stages of one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPhase {
    Idle,
    GeocodingPending,
    UploadingAssets,
    Assembling,
    Persisting,
    Succeeded,
    Failed,
}

/// Progress snapshot for UI feedback. The percentage is cosmetic and
/// monotonically non-decreasing within a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionProgress {
    pub phase: SubmissionPhase,
    pub percent: u8,
}

impl SubmissionProgress {
    fn idle() -> Self {
        Self {
            phase: SubmissionPhase::Idle,
            percent: 0,
        }
    }
}

/// Coordinates geocoding, asset uploads, assembly, and persistence for
/// story submissions
pub struct IngestionOrchestrator {
    geocoder: Arc<dyn Geocoder>,
    uploader: AssetUploader,
    store: Arc<dyn StoryStore>,
    buckets: StorageConfig,
    in_flight: AtomicBool,
    progress: watch::Sender<SubmissionProgress>,
}

impl IngestionOrchestrator {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        object_store: Arc<dyn ObjectStore>,
        store: Arc<dyn StoryStore>,
        buckets: StorageConfig,
    ) -> Self {
        let (progress, _) = watch::channel(SubmissionProgress::idle());

        Self {
            geocoder,
            uploader: AssetUploader::new(object_store),
            store,
            buckets,
            in_flight: AtomicBool::new(false),
            progress,
        }
    }

    /// Watch submission progress
    pub fn subscribe(&self) -> watch::Receiver<SubmissionProgress> {
        self.progress.subscribe()
    }

    /// Run one submission end to end.
    ///
    /// Validation failures are reported before any external call. While a
    /// submission is in flight, further calls return `SubmissionInFlight`
    /// without doing any work; the flag resets on every exit path.
    #[instrument(skip(self, draft), fields(title = %draft.title, mode = draft.mode().as_str()))]
    pub async fn submit(&self, draft: StoryDraft) -> Result<Story, IngestionError> {
        draft.validate()?;

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Submission rejected, another one is in flight");
            return Err(IngestionError::SubmissionInFlight);
        }
        let _guard = InFlightReset(&self.in_flight);

        let started = Instant::now();
        self.progress.send_replace(SubmissionProgress {
            phase: SubmissionPhase::GeocodingPending,
            percent: 10,
        });

        // No ordering dependency between geocoding and uploads; both must
        // settle before assembly.
        let (geocode, uploads) = tokio::join!(self.geocode_step(&draft), self.upload_step(&draft));

        self.advance(SubmissionPhase::Assembling, 70);
        let story = assemble(&draft, geocode, uploads);
        let story_type = story.story_type.clone();

        self.advance(SubmissionPhase::Persisting, 85);
        match self.store.insert_story(story).await {
            Ok(stored) => {
                self.advance(SubmissionPhase::Succeeded, 100);
                mosaic_common::metrics::record_ingestion(
                    started.elapsed().as_secs_f64(),
                    &story_type,
                    true,
                );
                info!(story_id = %stored.id, "Story ingested");
                Ok(stored)
            }
            Err(e) => {
                self.advance(SubmissionPhase::Failed, 100);
                mosaic_common::metrics::record_ingestion(
                    started.elapsed().as_secs_f64(),
                    &story_type,
                    false,
                );
                Err(e.into())
            }
        }
    }

    async fn geocode_step(&self, draft: &StoryDraft) -> Option<Coordinates> {
        // Already-resolved coordinates and an empty city both mean the
        // adapter is never invoked.
        if draft.coordinates.is_some() {
            return draft.coordinates;
        }
        if draft.city.trim().is_empty() {
            return None;
        }

        let result = self.geocoder.resolve(&draft.city, &draft.country).await;
        mosaic_common::metrics::record_geocode(result.is_some());
        result
    }

    async fn upload_step(&self, draft: &StoryDraft) -> UploadOutcomes {
        self.advance(SubmissionPhase::UploadingAssets, 40);

        let (image, audio, document) = tokio::join!(
            self.upload_asset(draft.image.as_ref(), &self.buckets.image_bucket),
            self.upload_asset(draft.audio.as_ref(), &self.buckets.audio_bucket),
            self.upload_asset(draft.document.as_ref(), &self.buckets.document_bucket),
        );

        UploadOutcomes {
            image,
            audio,
            document,
        }
    }

    async fn upload_asset(&self, asset: Option<&AssetSelection>, bucket: &str) -> Option<String> {
        let asset = asset?;

        let locator = self
            .uploader
            .upload(bucket, &asset.filename, asset.bytes.clone())
            .await;
        mosaic_common::metrics::record_upload(asset.kind.as_str(), locator.is_some());
        locator
    }

    /// Publish a phase change, never letting the percentage move backwards
    fn advance(&self, phase: SubmissionPhase, percent: u8) {
        self.progress.send_modify(|p| {
            p.phase = phase;
            p.percent = p.percent.max(percent);
        });
    }
}

/// Clears the in-flight flag on every exit path, success or failure
struct InFlightReset<'a>(&'a AtomicBool);

impl Drop for InFlightReset<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{AssetKind, UploadMode};
    use async_trait::async_trait;
    use mosaic_common::db::{MemoryStoryStore, StoryStore};
    use mosaic_common::errors::Result as AppResult;
    use mosaic_common::geocode::MockGeocoder;
    use mosaic_common::storage::MockStore;

    fn draft() -> StoryDraft {
        StoryDraft {
            title: "The Salt Road".to_string(),
            upload_mode: Some(UploadMode::Text),
            body_text: Some("Caravans carried salt and stories...".to_string()),
            tags_raw: "Trade, Migration".to_string(),
            city: "Timbuktu".to_string(),
            country: "Mali".to_string(),
            ..StoryDraft::default()
        }
    }

    fn asset(kind: AssetKind, name: &str) -> AssetSelection {
        AssetSelection {
            kind,
            filename: name.to_string(),
            bytes: vec![0; 8],
        }
    }

    fn orchestrator(
        geocoder: Arc<MockGeocoder>,
        object_store: Arc<MockStore>,
        store: Arc<dyn StoryStore>,
    ) -> IngestionOrchestrator {
        IngestionOrchestrator::new(
            geocoder,
            object_store,
            store,
            mosaic_common::AppConfig::default().storage,
        )
    }

    #[tokio::test]
    async fn test_empty_city_skips_geocoding() {
        let geocoder = Arc::new(MockGeocoder::found(1.0, 2.0));
        let store = Arc::new(MemoryStoryStore::new());
        let orch = orchestrator(geocoder.clone(), Arc::new(MockStore::new()), store.clone());

        let mut d = draft();
        d.city = String::new();

        let story = orch.submit(d).await.unwrap();

        assert_eq!(geocoder.call_count(), 0);
        assert!(story.latitude.is_none() && story.longitude.is_none());
        assert_eq!(store.story_count().await, 1);
    }

    #[tokio::test]
    async fn test_preresolved_coordinates_skip_adapter() {
        let geocoder = Arc::new(MockGeocoder::found(1.0, 2.0));
        let store = Arc::new(MemoryStoryStore::new());
        let orch = orchestrator(geocoder.clone(), Arc::new(MockStore::new()), store);

        let mut d = draft();
        d.coordinates = Some(Coordinates {
            latitude: 16.7666,
            longitude: -3.0026,
        });

        let story = orch.submit(d).await.unwrap();

        assert_eq!(geocoder.call_count(), 0);
        assert_eq!(story.latitude, Some(16.7666));
    }

    #[tokio::test]
    async fn test_geocode_miss_continues_with_null_coordinates() {
        let store = Arc::new(MemoryStoryStore::new());
        let orch = orchestrator(
            Arc::new(MockGeocoder::not_found()),
            Arc::new(MockStore::new()),
            store.clone(),
        );

        let story = orch.submit(draft()).await.unwrap();

        assert!(story.latitude.is_none());
        assert_eq!(store.story_count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_upload_degrades_but_never_aborts() {
        let store = Arc::new(MemoryStoryStore::new());
        let orch = orchestrator(
            Arc::new(MockGeocoder::found(1.0, 2.0)),
            Arc::new(MockStore::failing(&["story-audio"])),
            store.clone(),
        );

        let mut d = draft();
        d.image = Some(asset(AssetKind::Image, "photo.png"));
        d.audio = Some(asset(AssetKind::Audio, "tale.wav"));

        let story = orch.submit(d).await.unwrap();

        assert!(story.image_url.is_some());
        assert!(story.audio_url.is_none());
        assert!(story.document_url.is_none());
        assert_eq!(store.story_count().await, 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_is_fatal_with_verbatim_message() {
        let store = Arc::new(MemoryStoryStore::failing_inserts());
        let orch = orchestrator(
            Arc::new(MockGeocoder::not_found()),
            Arc::new(MockStore::new()),
            store,
        );

        let err = orch.submit(draft()).await.unwrap_err();
        assert!(
            matches!(&err, IngestionError::Persistence { message } if message == "connection refused")
        );

        // the in-flight flag must be reset; the next attempt reaches
        // persistence again instead of being rejected
        let err = orch.submit(draft()).await.unwrap_err();
        assert!(matches!(err, IngestionError::Persistence { .. }));
    }

    #[tokio::test]
    async fn test_validation_rejected_before_any_external_call() {
        let geocoder = Arc::new(MockGeocoder::found(1.0, 2.0));
        let object_store = Arc::new(MockStore::new());
        let store = Arc::new(MemoryStoryStore::new());
        let orch = orchestrator(geocoder.clone(), object_store.clone(), store.clone());

        let mut d = draft();
        d.title = String::new();

        let err = orch.submit(d).await.unwrap_err();

        assert!(matches!(err, IngestionError::Validation { .. }));
        assert_eq!(geocoder.call_count(), 0);
        assert_eq!(object_store.stored_count().await, 0);
        assert_eq!(store.story_count().await, 0);
    }

    /// Store whose inserts wait for an explicit release, letting tests
    /// hold a submission in the Persisting phase
    struct GatedStore {
        inner: MemoryStoryStore,
        gate: tokio::sync::Notify,
    }

    #[async_trait]
    impl StoryStore for GatedStore {
        async fn insert_story(&self, story: Story) -> AppResult<Story> {
            self.gate.notified().await;
            self.inner.insert_story(story).await
        }

        async fn find_story_by_id(&self, id: uuid::Uuid) -> AppResult<Option<Story>> {
            self.inner.find_story_by_id(id).await
        }

        async fn set_curriculum(&self, id: &str, curriculum: &str) -> AppResult<()> {
            self.inner.set_curriculum(id, curriculum).await
        }
    }

    #[tokio::test]
    async fn test_second_submission_rejected_while_in_flight() {
        let store = Arc::new(GatedStore {
            inner: MemoryStoryStore::new(),
            gate: tokio::sync::Notify::new(),
        });
        let orch = Arc::new(orchestrator(
            Arc::new(MockGeocoder::not_found()),
            Arc::new(MockStore::new()),
            store.clone(),
        ));

        let mut progress = orch.subscribe();

        let first = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.submit(draft()).await })
        };

        progress
            .wait_for(|p| p.phase == SubmissionPhase::Persisting)
            .await
            .unwrap();

        // second submission while the first is parked in Persisting
        let err = orch.submit(draft()).await.unwrap_err();
        assert!(matches!(err, IngestionError::SubmissionInFlight));

        store.gate.notify_one();
        first.await.unwrap().unwrap();

        // flag cleared after success; a fresh submission is accepted
        store.gate.notify_one();
        orch.submit(draft()).await.unwrap();
        assert_eq!(store.inner.story_count().await, 2);
    }

    #[tokio::test]
    async fn test_progress_reaches_succeeded_and_is_monotonic() {
        let orch = Arc::new(orchestrator(
            Arc::new(MockGeocoder::found(1.0, 2.0)),
            Arc::new(MockStore::new()),
            Arc::new(MemoryStoryStore::new()),
        ));

        let mut rx = orch.subscribe();
        let observer = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let p = *rx.borrow();
                seen.push(p);
                if matches!(p.phase, SubmissionPhase::Succeeded | SubmissionPhase::Failed) {
                    break;
                }
            }
            seen
        });

        orch.submit(draft()).await.unwrap();
        let seen = observer.await.unwrap();

        assert_eq!(seen.last().unwrap().phase, SubmissionPhase::Succeeded);
        assert!(seen.windows(2).all(|w| w[0].percent <= w[1].percent));
        assert_eq!(seen.last().unwrap().percent, 100);
    }
}
