//! Data models for the Story API.
//!
//! This module contains the data structures shared by the cache, the API
//! client and the interception worker:
//!
//! - `Story`, `CachedStory`: stories as served by the API and as decorated
//!   when read back from the offline cache
//! - `NewStory`, `PhotoUpload`: story submission input
//! - `PushSubscription`: Web Push subscription registration
//! - `ApiEnvelope`: raw response body shapes
//! - `StoryResponse`: the canonical result every API call resolves to

pub mod response;
pub mod story;
pub mod subscription;

pub use response::{ApiEnvelope, LoginResult, StoryResponse};
pub use story::{CachedStory, NewStory, PhotoUpload, Story};
pub use subscription::{PushSubscription, SubscriptionKeys};
