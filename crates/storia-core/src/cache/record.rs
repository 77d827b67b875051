use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Story;

/// Cached payloads older than this are refused by the offline fallback.
pub const CACHE_MAX_AGE_HOURS: i64 = 24;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachePayload {
    #[serde(rename = "listStory")]
    pub list_story: Option<Vec<Story>>,
    #[serde(rename = "detailStory")]
    pub detail_story: Option<Story>,
}

/// One row of the cache store, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub id: String,
    pub payload: CachePayload,
    pub timestamp: DateTime<Utc>,
}

impl CacheRecord {
    pub fn new(id: impl Into<String>, payload: CachePayload) -> Self {
        Self {
            id: id.into(),
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.timestamp
    }

    pub fn age_minutes(&self) -> i64 {
        self.age().num_minutes()
    }

    /// True once the record is strictly older than `CACHE_MAX_AGE_HOURS`
    pub fn is_expired(&self) -> bool {
        self.age() > Duration::hours(CACHE_MAX_AGE_HOURS)
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn story_count(&self) -> usize {
        self.payload.list_story.as_ref().map(Vec::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_aged(minutes: i64) -> CacheRecord {
        let mut record = CacheRecord::new("stories-page1-size10-loc0", CachePayload::default());
        record.timestamp = Utc::now() - Duration::minutes(minutes);
        record
    }

    #[test]
    fn test_age_display() {
        assert_eq!(record_aged(0).age_display(), "just now");
        assert_eq!(record_aged(5).age_display(), "5m ago");
        assert_eq!(record_aged(90).age_display(), "2h ago");
        assert_eq!(record_aged(70).age_display(), "1h ago");
        assert_eq!(record_aged(1440 * 2).age_display(), "2d ago");
        assert_eq!(record_aged(-10).age_display(), "just now");
    }

    #[test]
    fn test_is_expired() {
        assert!(!record_aged(0).is_expired());
        assert!(!record_aged(23 * 60).is_expired());
        assert!(record_aged(24 * 60 + 1).is_expired());
    }

    #[test]
    fn test_wire_format() {
        let record = CacheRecord::new("story-1", CachePayload::default());
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["id"], "story-1");
        assert!(value["payload"]["listStory"].is_null());
        assert!(value["payload"]["detailStory"].is_null());
        assert!(value["timestamp"].is_string());
    }
}
