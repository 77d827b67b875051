//! Local caching module for offline data access.
//!
//! This module provides the `CacheStore`, a single-table key/value store of
//! decoded API payloads, and the `CacheManager` built on top of it for the
//! offline feed and per-story cache removal. Records are considered expired
//! for offline fallback after 24 hours.
//!
//! Cache keys in use:
//! - `stories-page{page}-size{size}-loc{location}` for feed pages
//! - `story-{id}` for story details
//! - `latestStories` for the response to the last story submission

pub mod error;
pub mod manager;
pub mod record;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use manager::{
    stories_cache_key, story_cache_key, CacheManager, LATEST_STORIES_KEY,
};
pub use record::{CachePayload, CacheRecord, CACHE_MAX_AGE_HOURS};
pub use store::CacheStore;
