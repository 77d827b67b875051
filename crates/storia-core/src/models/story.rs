use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "photoUrl", default)]
    pub photo_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(rename = "createdAt", default)]
    pub created_at: String,
}

impl Story {
    /// Both coordinates, if the story was posted with a location
    pub fn location(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// A story read back from the offline cache.
///
/// The decoration only lives at the view level; it is never written to the
/// store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedStory {
    #[serde(flatten)]
    pub story: Story,
    #[serde(rename = "fromCache")]
    pub from_cache: bool,
    #[serde(rename = "cacheKey")]
    pub cache_key: String,
}

impl CachedStory {
    pub fn new(story: Story, cache_key: &str) -> Self {
        Self {
            story,
            from_cache: true,
            cache_key: cache_key.to_string(),
        }
    }
}

/// Photo attached to a new story
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    /// Read a photo from disk, guessing the MIME type from the extension
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo".to_string());
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        Ok(Self {
            file_name,
            mime_type: mime_for_extension(&extension).to_string(),
            bytes,
        })
    }
}

fn mime_for_extension(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone)]
pub struct NewStory {
    pub description: String,
    pub photo: PhotoUpload,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_story_from_api() {
        let json = r#"{"id":"story-FvU4u0Vp2S3PMsFg","name":"Dimas","description":"Lorem Ipsum","photoUrl":"https://story-api.dicoding.dev/images/stories/photos-1641623658595_dummy-pic.png","createdAt":"2022-01-08T06:34:18.598Z","lat":-10.212,"lon":-16.002}"#;

        let story: Story = serde_json::from_str(json).expect("story should parse");
        assert_eq!(story.id, "story-FvU4u0Vp2S3PMsFg");
        assert_eq!(story.name, "Dimas");
        assert_eq!(story.location(), Some((-10.212, -16.002)));
    }

    #[test]
    fn test_story_without_location() {
        let json = r#"{"id":"story-1","name":"A","description":"B","photoUrl":"u","createdAt":"2024-01-01T00:00:00Z","lat":null,"lon":null}"#;
        let story: Story = serde_json::from_str(json).expect("story should parse");
        assert_eq!(story.location(), None);

        // Coordinates are omitted rather than written as null
        let out = serde_json::to_string(&story).unwrap();
        assert!(!out.contains("lat"));
    }

    #[test]
    fn test_cached_story_serializes_flat() {
        let story = Story {
            id: "story-1".to_string(),
            name: "A".to_string(),
            description: "B".to_string(),
            photo_url: "u".to_string(),
            lat: None,
            lon: None,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };
        let cached = CachedStory::new(story, "stories-page1-size10-loc0");
        let value = serde_json::to_value(&cached).unwrap();

        assert_eq!(value["id"], "story-1");
        assert_eq!(value["fromCache"], true);
        assert_eq!(value["cacheKey"], "stories-page1-size10-loc0");
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for_extension("jpg"), "image/jpeg");
        assert_eq!(mime_for_extension("png"), "image/png");
        assert_eq!(mime_for_extension("heic"), "application/octet-stream");
    }
}
