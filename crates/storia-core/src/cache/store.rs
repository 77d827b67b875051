//! Single-table persistent key/value store.
//!
//! Each record is one JSON document under `<cache_dir>/stories/`, named
//! after the SHA-256 of its id. The id itself lives inside the document.
//! Writes land in a temporary file that is renamed over the target, so a
//! reader never sees a half-written record.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::{CachePayload, CacheRecord, StoreError, StoreResult};

/// Table (directory) holding the records
const STORE_NAME: &str = "stories";

const RECORD_EXTENSION: &str = "json";

pub struct CacheStore {
    dir: PathBuf,
    // Serializes writers; single-file renames keep readers consistent
    write_lock: Mutex<()>,
}

impl CacheStore {
    /// Open (creating if needed) the store under `cache_dir`
    pub fn open(cache_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = cache_dir.as_ref().join(STORE_NAME);
        std::fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Cache store opened");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Hashed so that ids differing only in case, or too long for a file
    /// name, still get their own file
    pub(crate) fn record_path(&self, id: &str) -> PathBuf {
        let file_stem = hex::encode(Sha256::digest(id.as_bytes()));
        self.dir.join(format!("{}.{}", file_stem, RECORD_EXTENSION))
    }

    fn check_key(id: &str) -> StoreResult<()> {
        if id.trim().is_empty() {
            return Err(StoreError::InvalidKey);
        }
        Ok(())
    }

    /// Insert or overwrite a record. The previous record under the same id,
    /// if any, is replaced entirely.
    pub fn put(&self, record: &CacheRecord) -> StoreResult<()> {
        if record.id.trim().is_empty() {
            return Err(StoreError::InvalidRecord(
                "record has no usable id".to_string(),
            ));
        }

        let contents = serde_json::to_string_pretty(record).map_err(|e| StoreError::Corrupt {
            id: record.id.clone(),
            source: e,
        })?;

        let path = self.record_path(&record.id);
        let tmp_path = path.with_extension(format!("{}.tmp", RECORD_EXTENSION));

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        std::fs::write(&tmp_path, contents)?;
        std::fs::rename(&tmp_path, &path)?;

        debug!(id = %record.id, "Cache record stored");
        Ok(())
    }

    /// Insert a record given as raw JSON.
    ///
    /// The value must be an object with a non-empty string `id`. A missing
    /// `payload` is stored empty and a missing `timestamp` is set to now.
    pub fn put_json(&self, value: Value) -> StoreResult<()> {
        let mut map = match value {
            Value::Object(map) => map,
            _ => {
                return Err(StoreError::InvalidRecord(
                    "record is not a JSON object".to_string(),
                ))
            }
        };
        let id = match map.remove("id") {
            Some(Value::String(id)) if !id.trim().is_empty() => id,
            _ => {
                return Err(StoreError::InvalidRecord(
                    "record has no usable id".to_string(),
                ))
            }
        };

        let payload = match map.remove("payload") {
            None | Some(Value::Null) => CachePayload::default(),
            Some(payload) => serde_json::from_value(payload)
                .map_err(|e| StoreError::InvalidRecord(format!("{}: payload: {}", id, e)))?,
        };
        let timestamp = match map.remove("timestamp") {
            None | Some(Value::Null) => Utc::now(),
            Some(timestamp) => serde_json::from_value::<DateTime<Utc>>(timestamp)
                .map_err(|e| StoreError::InvalidRecord(format!("{}: timestamp: {}", id, e)))?,
        };

        self.put(&CacheRecord {
            id,
            payload,
            timestamp,
        })
    }

    pub fn get(&self, id: &str) -> StoreResult<CacheRecord> {
        Self::check_key(id)?;

        let path = self.record_path(id);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
            id: id.to_string(),
            source: e,
        })
    }

    /// All readable records, ordered by id. Unreadable files are skipped.
    pub fn get_all(&self) -> StoreResult<Vec<CacheRecord>> {
        let mut records = Vec::new();

        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }

            let parsed = std::fs::read_to_string(&path)
                .map_err(StoreError::from)
                .and_then(|contents| {
                    serde_json::from_str::<CacheRecord>(&contents).map_err(|e| StoreError::Corrupt {
                        id: path.display().to_string(),
                        source: e,
                    })
                });

            match parsed {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable cache record"),
            }
        }

        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    /// Remove a record. Removing an absent id is not an error.
    pub fn delete(&self, id: &str) -> StoreResult<()> {
        Self::check_key(id)?;

        let path = self.record_path(id);
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(id, "Cache record deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachePayload;
    use crate::error::ErrorKind;
    use crate::models::Story;

    fn story(id: &str) -> Story {
        Story {
            id: id.to_string(),
            name: "Dimas".to_string(),
            description: format!("Description of {}", id),
            photo_url: format!("https://example.com/{}.png", id),
            lat: Some(-6.2),
            lon: Some(106.8),
            created_at: "2024-03-01T10:00:00Z".to_string(),
        }
    }

    fn listing_record(id: &str, stories: &[&str]) -> CacheRecord {
        CacheRecord::new(
            id,
            CachePayload {
                list_story: Some(stories.iter().map(|s| story(s)).collect()),
                detail_story: None,
            },
        )
    }

    fn open_store() -> (tempfile::TempDir, CacheStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_put_then_get_returns_same_record() {
        let (_dir, store) = open_store();
        let record = listing_record("stories-page1-size10-loc0", &["story-1", "story-2"]);

        store.put(&record).unwrap();
        assert_eq!(store.get("stories-page1-size10-loc0").unwrap(), record);
    }

    #[test]
    fn test_put_overwrites_whole_record() {
        let (_dir, store) = open_store();
        store
            .put(&listing_record("key", &["story-1", "story-2"]))
            .unwrap();

        let replacement = CacheRecord::new(
            "key",
            CachePayload {
                list_story: None,
                detail_story: Some(story("story-9")),
            },
        );
        store.put(&replacement).unwrap();

        let loaded = store.get("key").unwrap();
        assert!(loaded.payload.list_story.is_none());
        assert_eq!(loaded.payload.detail_story.unwrap().id, "story-9");
        assert_eq!(store.get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let (_dir, store) = open_store();
        let err = store.get("stories-page7-size10-loc0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_put_rejects_blank_id() {
        let (_dir, store) = open_store();
        let err = store
            .put(&CacheRecord::new("  ", CachePayload::default()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRecord);
    }

    #[test]
    fn test_put_json_validation() {
        let (_dir, store) = open_store();

        let err = store.put_json(serde_json::json!("not an object")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRecord);

        let err = store
            .put_json(serde_json::json!({"payload": {"listStory": null, "detailStory": null}}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRecord);

        store
            .put_json(serde_json::json!({
                "id": "story-1",
                "payload": {"listStory": null, "detailStory": null},
                "timestamp": "2024-03-01T10:00:00Z"
            }))
            .unwrap();
        assert_eq!(store.get("story-1").unwrap().id, "story-1");
    }

    #[test]
    fn test_put_json_fills_missing_fields() {
        let (_dir, store) = open_store();
        let before = Utc::now();

        store
            .put_json(serde_json::json!({
                "id": "latestStories",
                "payload": {"listStory": null, "detailStory": null}
            }))
            .unwrap();
        let record = store.get("latestStories").unwrap();
        assert_eq!(record.payload, CachePayload::default());
        assert!(record.timestamp >= before);

        store.put_json(serde_json::json!({"id": "story-story-1"})).unwrap();
        let record = store.get("story-story-1").unwrap();
        assert!(record.payload.list_story.is_none());
        assert!(record.payload.detail_story.is_none());

        // A present but malformed field is still refused
        let err = store
            .put_json(serde_json::json!({"id": "k", "timestamp": "yesterday"}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRecord);
    }

    #[test]
    fn test_delete() {
        let (_dir, store) = open_store();
        store.put(&listing_record("key", &["story-1"])).unwrap();

        store.delete("key").unwrap();
        assert_eq!(store.get("key").unwrap_err().kind(), ErrorKind::NotFound);

        // Absent ids are a no-op
        store.delete("key").unwrap();

        assert_eq!(store.delete("").unwrap_err().kind(), ErrorKind::InvalidKey);
    }

    #[test]
    fn test_get_all_sorted_and_skips_garbage() {
        let (_dir, store) = open_store();
        store.put(&listing_record("story-b", &[])).unwrap();
        store.put(&listing_record("story-a", &[])).unwrap();
        std::fs::write(store.dir().join("garbage.json"), "{not json").unwrap();

        let ids: Vec<String> = store.get_all().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["story-a", "story-b"]);
    }

    #[test]
    fn test_keys_with_path_characters_stay_inside_store() {
        let (_dir, store) = open_store();
        store.put(&listing_record("../escape/key", &["story-1"])).unwrap();

        assert_eq!(store.get("../escape/key").unwrap().story_count(), 1);
        assert_eq!(std::fs::read_dir(store.dir()).unwrap().count(), 1);
    }

    #[test]
    fn test_ids_differing_in_case_get_separate_files() {
        let (_dir, store) = open_store();
        store.put(&listing_record("story-story-AbC", &["a"])).unwrap();
        store.put(&listing_record("story-story-abc", &["a", "b"])).unwrap();

        assert_ne!(
            store.record_path("story-story-AbC").to_string_lossy().to_lowercase(),
            store.record_path("story-story-abc").to_string_lossy().to_lowercase()
        );
        assert_eq!(store.get("story-story-AbC").unwrap().story_count(), 1);
        assert_eq!(store.get("story-story-abc").unwrap().story_count(), 2);
        assert_eq!(store.get_all().unwrap().len(), 2);
    }

    #[test]
    fn test_long_id_is_stored() {
        let (_dir, store) = open_store();
        let id = format!("story-{}", "x".repeat(1000));

        store.put(&listing_record(&id, &["story-1"])).unwrap();
        assert_eq!(store.get(&id).unwrap().id, id);
    }
}
