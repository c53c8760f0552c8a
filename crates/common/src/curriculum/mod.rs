//! Curriculum orchestration
//!
//! Sequences a single curriculum generation for an existing story:
//! validate inputs, call the generation service, persist the text.
//! Holds an advisory per-story in-flight guard so rapid repeated
//! activation cannot fan out duplicate requests from one process.
//! The guard is not a cross-process exclusivity guarantee; two
//! independent clients may still race, and the later write wins.

use crate::db::StoryStore;
use crate::errors::{AppError, Result};
use crate::generation::CurriculumGenerator;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, instrument};

/// Orchestrates generation requests and the persistence update
pub struct CurriculumService {
    generator: Arc<dyn CurriculumGenerator>,
    store: Arc<dyn StoryStore>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl CurriculumService {
    pub fn new(generator: Arc<dyn CurriculumGenerator>, store: Arc<dyn StoryStore>) -> Self {
        Self {
            generator,
            store,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Generate a curriculum for the story and persist it.
    ///
    /// The story id is opaque here; persistence applies it as a
    /// last-write-wins update and an id matching no row is not an error.
    /// Fails fast on empty inputs without touching the generation service.
    /// A persistence failure surfaces as `DatabaseUpdate` with the
    /// underlying message; the story is left with its curriculum unset.
    #[instrument(skip(self, title, excerpt, culture), fields(story_id = %story_id))]
    pub async fn generate_and_store(
        &self,
        story_id: &str,
        title: &str,
        excerpt: &str,
        culture: &str,
    ) -> Result<String> {
        validate_request(story_id, title, excerpt, culture)?;

        let _guard = InFlightGuard::acquire(&self.in_flight, story_id)?;

        info!(model = self.generator.model_name(), "Requesting curriculum generation");

        let started = std::time::Instant::now();
        let generation = self.generator.generate(title, excerpt, culture).await;
        crate::metrics::record_generation(
            started.elapsed().as_secs_f64(),
            self.generator.model_name(),
            generation.is_ok(),
        );
        let curriculum = generation?;

        self.store
            .set_curriculum(story_id, &curriculum)
            .await
            .map_err(|e| AppError::DatabaseUpdate {
                message: e.details().unwrap_or_else(|| e.to_string()),
            })?;

        info!(chars = curriculum.len(), "Curriculum generated and stored");

        Ok(curriculum)
    }
}

/// All request fields must be present and non-empty before anything is sent
fn validate_request(story_id: &str, title: &str, excerpt: &str, culture: &str) -> Result<()> {
    let mut missing = Vec::new();

    if story_id.trim().is_empty() {
        missing.push("storyId".to_string());
    }
    if title.trim().is_empty() {
        missing.push("title".to_string());
    }
    if excerpt.trim().is_empty() {
        missing.push("excerpt".to_string());
    }
    if culture.trim().is_empty() {
        missing.push("culture".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::MissingFields { fields: missing })
    }
}

// Lock poisoning only means another caller panicked mid-insert; the set
// is still usable, so recover the guard instead of propagating the panic.
fn lock_set(set: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Releases the per-story in-flight slot on every exit path
struct InFlightGuard {
    set: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl InFlightGuard {
    fn acquire(set: &Arc<Mutex<HashSet<String>>>, id: &str) -> Result<Self> {
        if !lock_set(set).insert(id.to_string()) {
            return Err(AppError::GenerationInFlight { id: id.to_string() });
        }
        Ok(Self {
            set: set.clone(),
            id: id.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock_set(&self.set).remove(&self.id);
    }
}
