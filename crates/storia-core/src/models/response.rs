//! Response bodies returned by the Story API and the canonical shape every
//! call is normalized to.

use serde::{Deserialize, Serialize};

use super::Story;

/// Raw JSON body as the API (or the interception worker) sends it.
///
/// Listing endpoints have been seen returning stories both at the top level
/// (`listStory`) and nested (`data.listStory`); both are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "listStory", default)]
    pub list_story: Option<Vec<Story>>,
    #[serde(default)]
    pub data: Option<EnvelopeData>,
    #[serde(default)]
    pub story: Option<Story>,
    #[serde(rename = "loginResult", default)]
    pub login_result: Option<LoginResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvelopeData {
    #[serde(rename = "listStory", default)]
    pub list_story: Option<Vec<Story>>,
}

impl ApiEnvelope {
    pub fn into_response(self) -> StoryResponse {
        let listing = self
            .list_story
            .or_else(|| self.data.and_then(|d| d.list_story));

        StoryResponse {
            listing,
            detail: self.story,
            login: self.login_result,
            message: self.message,
            from_cache: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResult {
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub token: String,
}

/// The single success shape for every API operation.
///
/// Failures are carried by `ApiError`; an API body with `error: true` never
/// becomes a `StoryResponse`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoryResponse {
    pub listing: Option<Vec<Story>>,
    pub detail: Option<Story>,
    pub login: Option<LoginResult>,
    pub message: Option<String>,
    /// Set when the response was served from the offline cache
    pub from_cache: bool,
}

impl StoryResponse {
    pub fn stories(&self) -> &[Story] {
        self.listing.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_at_top_level() {
        let json = r#"{"error":false,"message":"Stories fetched successfully","listStory":[{"id":"story-1","name":"A","description":"d","photoUrl":"p","createdAt":"2024-01-01T00:00:00Z"}]}"#;
        let envelope: ApiEnvelope = serde_json::from_str(json).unwrap();
        assert!(!envelope.error);

        let response = envelope.into_response();
        assert_eq!(response.stories().len(), 1);
        assert_eq!(response.stories()[0].id, "story-1");
        assert!(!response.from_cache);
    }

    #[test]
    fn test_listing_nested_under_data() {
        let json = r#"{"error":false,"data":{"listStory":[{"id":"story-2"}]}}"#;
        let response = serde_json::from_str::<ApiEnvelope>(json)
            .unwrap()
            .into_response();
        assert_eq!(response.stories()[0].id, "story-2");
    }

    #[test]
    fn test_login_result() {
        let json = r#"{"error":false,"message":"success","loginResult":{"userId":"user-yj5pc_LARC_AgK61","name":"Arif Faizin","token":"eyJhbGciOi"}}"#;
        let response = serde_json::from_str::<ApiEnvelope>(json)
            .unwrap()
            .into_response();
        let login = response.login.expect("login result");
        assert_eq!(login.name, "Arif Faizin");
        assert_eq!(login.token, "eyJhbGciOi");
    }

    #[test]
    fn test_error_flag_and_missing_fields() {
        let json = r#"{"error":true,"message":"Invalid password"}"#;
        let envelope: ApiEnvelope = serde_json::from_str(json).unwrap();
        assert!(envelope.error);
        assert_eq!(envelope.message.as_deref(), Some("Invalid password"));
        assert!(envelope.list_story.is_none());
        assert!(envelope.story.is_none());
    }
}
