//! Repository pattern for database operations

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

/// Persistence seam used by the orchestrators, so tests can substitute
/// an in-memory fake for the live database.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Insert a fully assembled story record
    async fn insert_story(&self, story: Story) -> Result<Story>;

    /// Find a story by its identifier
    async fn find_story_by_id(&self, id: Uuid) -> Result<Option<Story>>;

    /// Set the curriculum text on the story matching the given identifier.
    /// The id is opaque at this seam; one that matches no row behaves like
    /// a zero-row update and is not an error (last-write-wins).
    async fn set_curriculum(&self, id: &str, curriculum: &str) -> Result<()>;
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    /// List stories, newest first, with pagination
    pub async fn list_stories(&self, offset: u64, limit: u64) -> Result<(Vec<Story>, u64)> {
        let paginator = StoryEntity::find()
            .order_by_desc(StoryColumn::CreatedAt)
            .paginate(self.read_conn(), limit);

        let total = paginator.num_items().await?;
        let stories = paginator.fetch_page(offset / limit.max(1)).await?;

        Ok((stories, total))
    }

    /// Delete a story by ID
    pub async fn delete_story(&self, id: Uuid) -> Result<bool> {
        let result = StoryEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl StoryStore for Repository {
    async fn insert_story(&self, story: Story) -> Result<Story> {
        let model = StoryActiveModel {
            id: Set(story.id),
            title: Set(story.title),
            storyteller: Set(story.storyteller),
            culture: Set(story.culture),
            hometown: Set(story.hometown),
            country: Set(story.country),
            tags: Set(story.tags),
            story_type: Set(story.story_type),
            color: Set(story.color),
            latitude: Set(story.latitude),
            longitude: Set(story.longitude),
            image_url: Set(story.image_url),
            audio_url: Set(story.audio_url),
            document_url: Set(story.document_url),
            excerpt: Set(story.excerpt),
            curriculum: Set(story.curriculum),
            created_at: Set(story.created_at),
        };

        model.insert(self.write_conn()).await.map_err(Into::into)
    }

    async fn find_story_by_id(&self, id: Uuid) -> Result<Option<Story>> {
        StoryEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn set_curriculum(&self, id: &str, curriculum: &str) -> Result<()> {
        // An id that cannot name a row is the same as an update that
        // matches zero rows.
        let Ok(uuid) = Uuid::parse_str(id) else {
            tracing::debug!(id, "Curriculum update matched no story");
            return Ok(());
        };

        let result = StoryEntity::update_many()
            .col_expr(StoryColumn::Curriculum, Expr::value(curriculum))
            .filter(StoryColumn::Id.eq(uuid))
            .exec(self.write_conn())
            .await?;

        if result.rows_affected == 0 {
            tracing::debug!(id, "Curriculum update matched no story");
        }

        Ok(())
    }
}

/// In-memory store for tests, with failure injection and update counting
#[derive(Default)]
pub struct MemoryStoryStore {
    stories: tokio::sync::Mutex<Vec<Story>>,
    fail_inserts: bool,
    fail_updates: bool,
    update_calls: std::sync::atomic::AtomicUsize,
}

impl MemoryStoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All inserts fail with the given flavor of database error
    pub fn failing_inserts() -> Self {
        Self {
            fail_inserts: true,
            ..Self::default()
        }
    }

    /// All curriculum updates fail
    pub fn failing_updates() -> Self {
        Self {
            fail_updates: true,
            ..Self::default()
        }
    }

    /// Seed the store with an existing story
    pub async fn seed(&self, story: Story) {
        self.stories.lock().await.push(story);
    }

    pub async fn story_count(&self) -> usize {
        self.stories.lock().await.len()
    }

    pub fn update_call_count(&self) -> usize {
        self.update_calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl StoryStore for MemoryStoryStore {
    async fn insert_story(&self, story: Story) -> Result<Story> {
        if self.fail_inserts {
            return Err(AppError::DatabaseConnection {
                message: "connection refused".to_string(),
            });
        }

        self.stories.lock().await.push(story.clone());
        Ok(story)
    }

    async fn find_story_by_id(&self, id: Uuid) -> Result<Option<Story>> {
        Ok(self
            .stories
            .lock()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn set_curriculum(&self, id: &str, curriculum: &str) -> Result<()> {
        self.update_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        if self.fail_updates {
            return Err(AppError::DatabaseConnection {
                message: "update rejected".to_string(),
            });
        }

        let mut stories = self.stories.lock().await;
        if let Some(story) = stories.iter_mut().find(|s| s.id.to_string() == id) {
            story.curriculum = Some(curriculum.to_string());
        }

        Ok(())
    }
}
