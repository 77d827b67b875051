//! API client for the Story API.
//!
//! Every call goes through `ApiClient::fetch_with_fallback`: successful
//! responses tagged with a cache key are written to the cache store, and
//! when the device is offline the last cached payload for that key is
//! served instead, as long as it is less than a day old.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use super::connectivity::ConnectivityProbe;
use super::transport::{FormPart, FormValue, Request, Response, Transport};
use super::ApiError;
use crate::cache::{
    stories_cache_key, story_cache_key, CacheManager, CachePayload, CacheRecord, CacheStore,
    StoreError, LATEST_STORIES_KEY,
};
use crate::models::{ApiEnvelope, LoginResult, NewStory, PushSubscription, StoryResponse};

// ============================================================================
// Constants
// ============================================================================

/// Base URL of the public Story API
pub const DEFAULT_API_BASE_URL: &str = "https://story-api.dicoding.dev/v1";

/// Message attached to responses served from the offline cache
pub const DEFAULT_OFFLINE_NOTICE: &str = "You are offline. Showing the last saved data.";

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// The API refuses shorter passwords at registration
const MIN_PASSWORD_LENGTH: usize = 8;

/// API client with transparent offline fallback.
/// Clone is cheap - the transport, store and probe are shared.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    store: Arc<CacheStore>,
    connectivity: Arc<dyn ConnectivityProbe>,
    base_url: String,
    offline_notice: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<CacheStore>,
        connectivity: Arc<dyn ConnectivityProbe>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            store,
            connectivity,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            offline_notice: DEFAULT_OFFLINE_NOTICE.to_string(),
            token: None,
        }
    }

    /// Replace the (localized) notice attached to cached responses
    pub fn with_offline_notice(mut self, notice: impl Into<String>) -> Self {
        self.offline_notice = notice.into();
        self
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Offline views over the same store this client writes to
    pub fn cache(&self) -> CacheManager {
        CacheManager::new(self.store.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, retrying with exponential backoff while rate limited.
    /// Any non-success status is returned as an error.
    async fn send(&self, request: Request) -> Result<Response, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self.transport.fetch(request.clone()).await?;
            if response.is_success() {
                return Ok(response);
            }

            match ApiError::from_status(response.status, &response.text()) {
                ApiError::RateLimited if retries < MAX_RATE_LIMIT_RETRIES => {
                    retries += 1;
                    warn!(url = %request.url, retry = retries, backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
                err => return Err(err),
            }
        }
    }

    /// Execute a request with the network-first, cache-fallback policy.
    ///
    /// Online, the decoded response is returned and (if `cache_key` is
    /// given and the body has no error flag) persisted under that key before
    /// returning. Offline, the network is skipped; with a cache key the
    /// cached payload is served if it is at most 24 hours old, otherwise
    /// `NoCachedData` or `CacheExpired`. Network failures while online are
    /// never answered from the cache.
    pub async fn fetch_with_fallback(
        &self,
        request: Request,
        cache_key: Option<&str>,
    ) -> Result<StoryResponse, ApiError> {
        let outcome = if self.connectivity.is_online() {
            self.fetch_online(request, cache_key).await
        } else {
            debug!(url = %request.url, "Offline, skipping network");
            Err(ApiError::Offline)
        };

        match (outcome, cache_key) {
            (Err(ApiError::Offline), Some(cache_key)) => self.read_cached(cache_key),
            (outcome, _) => outcome,
        }
    }

    async fn fetch_online(
        &self,
        request: Request,
        cache_key: Option<&str>,
    ) -> Result<StoryResponse, ApiError> {
        let url = request.url.clone();
        let response = self.send(request).await?;

        let envelope: ApiEnvelope = response
            .parse_json()
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", url, e)))?;

        if envelope.error {
            let message = envelope
                .message
                .unwrap_or_else(|| "Request was rejected".to_string());
            debug!(url = %url, message = %message, "API reported an error");
            return Err(ApiError::Rejected(message));
        }

        let response = envelope.into_response();

        if let Some(cache_key) = cache_key {
            let record = CacheRecord::new(
                cache_key,
                CachePayload {
                    list_story: response.listing.clone(),
                    detail_story: response.detail.clone(),
                },
            );
            if let Err(e) = self.store.put(&record) {
                warn!(cache_key, error = %e, "Failed to cache response");
            }
        }

        Ok(response)
    }

    fn read_cached(&self, cache_key: &str) -> Result<StoryResponse, ApiError> {
        let record = match self.store.get(cache_key) {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                return Err(ApiError::NoCachedData(cache_key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        if record.is_expired() {
            return Err(ApiError::CacheExpired {
                cache_key: cache_key.to_string(),
                age_hours: record.age().num_hours(),
            });
        }

        debug!(cache_key, age = %record.age_display(), "Serving cached response");
        Ok(StoryResponse {
            listing: record.payload.list_story,
            detail: record.payload.detail_story,
            login: None,
            message: Some(self.offline_notice.clone()),
            from_cache: true,
        })
    }

    // ===== Accounts =====

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<StoryResponse, ApiError> {
        if name.trim().is_empty() || email.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "name and email are required".to_string(),
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ApiError::InvalidInput(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let request = Request::post(self.url("/register")).json(serde_json::json!({
            "name": name,
            "email": email,
            "password": password,
        }));
        self.fetch_with_fallback(request, None).await
    }

    /// Log in and keep the returned token for subsequent requests
    pub async fn login(&mut self, email: &str, password: &str) -> Result<LoginResult, ApiError> {
        if email.trim().is_empty() || password.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "email and password are required".to_string(),
            ));
        }

        let request = Request::post(self.url("/login")).json(serde_json::json!({
            "email": email,
            "password": password,
        }));
        let response = self.fetch_with_fallback(request, None).await?;

        let login = response
            .login
            .ok_or_else(|| ApiError::InvalidResponse("login response has no loginResult".to_string()))?;
        self.token = Some(login.token.clone());
        info!(name = %login.name, "Logged in");
        Ok(login)
    }

    // ===== Stories =====

    pub async fn fetch_stories(
        &self,
        page: u32,
        size: u32,
        location: u8,
    ) -> Result<StoryResponse, ApiError> {
        let url = Url::parse_with_params(
            &self.url("/stories"),
            &[
                ("page", page.to_string()),
                ("size", size.to_string()),
                ("location", location.to_string()),
            ],
        )
        .map_err(|e| ApiError::InvalidInput(format!("invalid API base URL: {}", e)))?;

        let request = Request::get(url.as_str()).bearer(self.token());
        let cache_key = stories_cache_key(page, size, location);
        self.fetch_with_fallback(request, Some(&cache_key)).await
    }

    pub async fn fetch_story_detail(&self, story_id: &str) -> Result<StoryResponse, ApiError> {
        if story_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("story id is required".to_string()));
        }

        let mut url = Url::parse(&self.url("/stories"))
            .map_err(|e| ApiError::InvalidInput(format!("invalid API base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidInput("API base URL cannot hold a path".to_string()))?
            .push(story_id);

        let request = Request::get(url.as_str()).bearer(self.token());
        let cache_key = story_cache_key(story_id);
        self.fetch_with_fallback(request, Some(&cache_key)).await
    }

    /// Submit a new story. Rejected outright while offline; nothing is
    /// queued for later.
    pub async fn add_story(&self, story: &NewStory) -> Result<StoryResponse, ApiError> {
        if !self.connectivity.is_online() {
            warn!("Refusing to add a story while offline");
            return Err(ApiError::OfflineWriteRejected);
        }

        let mut parts = vec![
            FormPart {
                name: "description".to_string(),
                value: FormValue::Text(story.description.clone()),
            },
            FormPart {
                name: "photo".to_string(),
                value: FormValue::File {
                    file_name: story.photo.file_name.clone(),
                    mime_type: story.photo.mime_type.clone(),
                    bytes: story.photo.bytes.clone().into(),
                },
            },
        ];
        if let (Some(lat), Some(lon)) = (story.lat, story.lon) {
            parts.push(FormPart {
                name: "lat".to_string(),
                value: FormValue::Text(lat.to_string()),
            });
            parts.push(FormPart {
                name: "lon".to_string(),
                value: FormValue::Text(lon.to_string()),
            });
        }

        let request = Request::post(self.url("/stories"))
            .bearer(self.token())
            .multipart(parts);
        self.fetch_with_fallback(request, Some(LATEST_STORIES_KEY)).await
    }

    // ===== Push notifications =====

    pub async fn subscribe(&self, subscription: &PushSubscription) -> Result<StoryResponse, ApiError> {
        let body = serde_json::to_value(subscription)
            .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
        let request = Request::post(self.url("/notifications/subscribe"))
            .bearer(self.token())
            .json(body);
        self.fetch_with_fallback(request, None).await
    }

    pub async fn unsubscribe(&self, endpoint: &str) -> Result<StoryResponse, ApiError> {
        let request = Request::delete(self.url("/notifications/subscribe"))
            .bearer(self.token())
            .json(serde_json::json!({ "endpoint": endpoint }));
        self.fetch_with_fallback(request, None).await
    }
}
