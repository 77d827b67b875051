use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{CacheRecord, CacheStore, StoreError, StoreResult};
use crate::models::{CachedStory, Story};

/// Key under which the response to the last story submission is kept.
pub const LATEST_STORIES_KEY: &str = "latestStories";

/// Cache key for one feed page. The online write path and the offline read
/// path must agree on this exact format.
pub fn stories_cache_key(page: u32, size: u32, location: u8) -> String {
    format!("stories-page{}-size{}-loc{}", page, size, location)
}

pub fn story_cache_key(story_id: &str) -> String {
    format!("story-{}", story_id)
}

/// Offline views over the cache store.
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<CacheStore>,
}

impl CacheManager {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Stories cached for a feed page, each tagged with the key it came from.
    ///
    /// An absent entry or one without a listing yields an empty list.
    pub fn offline_stories(&self, page: u32, size: u32, location: u8) -> StoreResult<Vec<CachedStory>> {
        let cache_key = stories_cache_key(page, size, location);

        let record = match self.store.get(&cache_key) {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => return Ok(Vec::new()),
            Err(e @ StoreError::Corrupt { .. }) => {
                warn!(cache_key = %cache_key, error = %e, "Ignoring unreadable cache entry");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let stories = record.payload.list_story.unwrap_or_default();
        debug!(cache_key = %cache_key, count = stories.len(), "Loaded offline stories");

        Ok(stories
            .into_iter()
            .map(|story| CachedStory::new(story, &cache_key))
            .collect())
    }

    /// Remove one story from a cached listing and write the listing back.
    ///
    /// Returns the removed story. The record itself is kept, with its
    /// original timestamp, even when the listing becomes empty.
    pub fn delete_story_from_cache(&self, cache_key: &str, story_id: &str) -> StoreResult<Story> {
        if cache_key.trim().is_empty() || story_id.trim().is_empty() {
            return Err(StoreError::InvalidKey);
        }

        let mut record = match self.store.get(cache_key) {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) | Err(StoreError::Corrupt { .. }) => {
                return Err(StoreError::CacheMiss(cache_key.to_string()))
            }
            Err(e) => return Err(e),
        };

        let listing = record
            .payload
            .list_story
            .take()
            .ok_or_else(|| StoreError::CacheMiss(cache_key.to_string()))?;

        let (removed, kept): (Vec<Story>, Vec<Story>) =
            listing.into_iter().partition(|story| story.id == story_id);

        let removed = match removed.into_iter().next() {
            Some(story) => story,
            None => {
                return Err(StoreError::ItemNotFound {
                    cache_key: cache_key.to_string(),
                    story_id: story_id.to_string(),
                })
            }
        };

        record.payload.list_story = Some(kept);
        self.store.put(&record)?;

        info!(cache_key, story_id, "Removed story from cache");
        Ok(removed)
    }

    /// Drop a whole cache entry.
    pub fn delete_offline_story(&self, cache_key: &str) -> StoreResult<()> {
        self.store.delete(cache_key)?;
        info!(cache_key, "Deleted offline cache entry");
        Ok(())
    }

    /// Every cached entry, for inspection.
    pub fn cached_entries(&self) -> StoreResult<Vec<CacheRecord>> {
        self.store.get_all()
    }
}
