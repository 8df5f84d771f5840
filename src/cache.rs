// src/cache.rs
//
// Read-through cache of content items for assessment sessions. A cached
// item is immutable for the lifetime of the sessions holding it; observing
// server-side changes (views/completions counters) requires invalidation
// followed by a fresh fetch. The cache never writes counters itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use sqlx::SqlitePool;

use crate::{error::AppError, models::content::ContentItem};

#[derive(Clone, Default)]
pub struct ContentCache {
    inner: Arc<Mutex<HashMap<String, Arc<ContentItem>>>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Arc<ContentItem>>> {
        // Lock poisoning only matters if a panic happened mid-insert; the
        // map is still structurally sound, so keep serving.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the cached item, loading it from the database on a miss.
    ///
    /// Fails with `NotFound` when no such content exists and `Unavailable`
    /// when the store cannot be reached.
    pub async fn fetch(
        &self,
        pool: &SqlitePool,
        content_id: &str,
    ) -> Result<Arc<ContentItem>, AppError> {
        if let Some(item) = self.entries().get(content_id) {
            return Ok(Arc::clone(item));
        }

        let item = Arc::new(load_content(pool, content_id).await?);

        // Atomic replacement: sessions already holding the old Arc keep
        // their immutable snapshot.
        self.entries()
            .insert(content_id.to_string(), Arc::clone(&item));

        Ok(item)
    }

    /// Drops the cached copy so the next fetch observes server-side changes
    /// (called after a completion bumps the engagement counters).
    pub fn invalidate(&self, content_id: &str) {
        self.entries().remove(content_id);
    }
}

/// Loads one content item straight from the database.
pub async fn load_content<'e>(
    executor: impl sqlx::Executor<'e, Database = sqlx::Sqlite>,
    content_id: &str,
) -> Result<ContentItem, AppError> {
    sqlx::query_as::<_, ContentItem>(
        r#"
        SELECT id, document_id, user_id, content_type, subject, title,
               description, content_json, views, completions, average_score,
               created_at
        FROM contents
        WHERE id = ?
        "#,
    )
    .bind(content_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Content {} not found", content_id)))
}
