//! Request interception worker.
//!
//! The `ServiceWorker` sits beneath the API client as its `Transport`.
//! Once activated it answers GET requests from its own response caches
//! according to the route: story listings are network-first with an
//! offline JSON payload as last resort, page loads fall back to the cached
//! app shell, and everything else is cache-first. It also turns push
//! messages into notifications and handles notification clicks.
//!
//! The worker's caches are separate from the record store used by the
//! API client; neither sees the other's data.

pub mod cache_storage;
pub mod error;
pub mod lifecycle;
pub mod push;
pub mod routing;

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};
use url::Url;

use crate::api::{
    Request, Response, Transport, TransportError, DEFAULT_API_BASE_URL, DEFAULT_OFFLINE_NOTICE,
};

pub use cache_storage::{CacheStorage, Namespace};
pub use error::WorkerError;
pub use lifecycle::{Lifecycle, WorkerState};
pub use push::{
    ClickOutcome, ClientWindows, Notification, NotificationData, NotificationDefaults,
    NotificationSink,
};
pub use routing::{Router, Strategy};

/// Directory under the cache dir holding the worker namespaces
const WORKER_DIR: &str = "worker";

pub const DEFAULT_STATIC_CACHE_NAME: &str = "story-app-cache-v2";
pub const DEFAULT_API_CACHE_NAME: &str = "story-api-cache-v1";
pub const DEFAULT_APP_SHELL_URL: &str = "/index.html";
pub const DEFAULT_NOTIFICATION_ICON: &str = "/S.ico";

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub api_base_url: String,
    /// Namespace for precached and fetched static files. Bump the version
    /// suffix to drop old caches on the next activation.
    pub static_cache_name: String,
    pub api_cache_name: String,
    /// Absolute URLs fetched during install
    pub precache_urls: Vec<String>,
    /// Page served for failed navigations, relative to the requested page
    pub app_shell_url: String,
    pub offline_notice: String,
    pub notification_icon: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            static_cache_name: DEFAULT_STATIC_CACHE_NAME.to_string(),
            api_cache_name: DEFAULT_API_CACHE_NAME.to_string(),
            precache_urls: Vec::new(),
            app_shell_url: DEFAULT_APP_SHELL_URL.to_string(),
            offline_notice: DEFAULT_OFFLINE_NOTICE.to_string(),
            notification_icon: DEFAULT_NOTIFICATION_ICON.to_string(),
        }
    }
}

pub struct ServiceWorker {
    config: WorkerConfig,
    lifecycle: Mutex<Lifecycle>,
    network: Arc<dyn Transport>,
    caches: CacheStorage,
    router: Router,
    notifications: NotificationDefaults,
}

impl ServiceWorker {
    /// Create a worker in the `Parsed` state, with its namespaces under
    /// `<cache_dir>/worker/`
    pub fn new(
        config: WorkerConfig,
        network: Arc<dyn Transport>,
        cache_dir: impl AsRef<Path>,
    ) -> Result<Self, WorkerError> {
        let caches = CacheStorage::open(cache_dir.as_ref().join(WORKER_DIR))?;
        let router = Router::new(&config.api_base_url)?;
        let notifications = NotificationDefaults::new(config.notification_icon.clone());

        Ok(Self {
            config,
            lifecycle: Mutex::new(Lifecycle::default()),
            network,
            caches,
            router,
            notifications,
        })
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .state()
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn caches(&self) -> &CacheStorage {
        &self.caches
    }

    fn transition(&self, to: WorkerState) -> Result<(), WorkerError> {
        let from = self
            .lifecycle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .transition(to)?;
        info!(from = %from, to = %to, "Worker state changed");
        Ok(())
    }

    fn fail(&self, error: &WorkerError) {
        warn!(error = %error, "Worker failed, marking redundant");
        if let Err(e) = self.transition(WorkerState::Redundant) {
            debug!(error = %e, "Worker already redundant");
        }
    }

    /// Precache the configured URLs into the static namespace.
    /// Individual fetch failures are logged and skipped.
    pub async fn install(&self) -> Result<(), WorkerError> {
        self.transition(WorkerState::Installing)?;

        let namespace = match self.caches.open_namespace(&self.config.static_cache_name) {
            Ok(namespace) => namespace,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        let results = join_all(
            self.config
                .precache_urls
                .iter()
                .map(|url| self.precache(&namespace, url)),
        )
        .await;
        let cached = results.iter().filter(|ok| **ok).count();
        info!(cached, total = results.len(), "Precache finished");

        self.transition(WorkerState::Installed)
    }

    async fn precache(&self, namespace: &Namespace, url: &str) -> bool {
        match self.network.fetch(Request::get(url)).await {
            Ok(response) if response.is_success() => match namespace.put(url, &response) {
                Ok(()) => true,
                Err(e) => {
                    warn!(url, error = %e, "Failed to store precached file");
                    false
                }
            },
            Ok(response) => {
                warn!(url, status = response.status, "Precache request failed");
                false
            }
            Err(e) => {
                warn!(url, error = %e, "Precache request failed");
                false
            }
        }
    }

    /// Delete every namespace not in use by this version and start
    /// intercepting. Returns the deleted namespace names.
    pub async fn activate(&self) -> Result<Vec<String>, WorkerError> {
        self.transition(WorkerState::Activating)?;

        match self.purge_stale_caches() {
            Ok(deleted) => {
                self.transition(WorkerState::Activated)?;
                Ok(deleted)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn purge_stale_caches(&self) -> Result<Vec<String>, WorkerError> {
        let whitelist = [
            self.config.static_cache_name.as_str(),
            self.config.api_cache_name.as_str(),
        ];

        let mut deleted = Vec::new();
        for name in self.caches.keys()? {
            if !whitelist.contains(&name.as_str()) {
                info!(namespace = %name, "Deleting old cache");
                self.caches.delete(&name)?;
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Install and activate right away, without waiting for older workers
    pub async fn start(&self) -> Result<(), WorkerError> {
        self.install().await?;
        self.activate().await?;
        Ok(())
    }

    /// Stop intercepting; requests go straight to the network afterwards
    pub fn retire(&self) -> Result<(), WorkerError> {
        self.transition(WorkerState::Redundant)
    }

    pub async fn handle_fetch(&self, request: Request) -> Result<Response, TransportError> {
        if !self.state().intercepts() {
            return self.network.fetch(request).await;
        }

        let strategy = self.router.route(&request);
        debug!(url = %request.url, ?strategy, "Intercepted request");
        match strategy {
            Strategy::PassThrough => self.network.fetch(request).await,
            Strategy::Api => self.network_first_api(request).await,
            Strategy::Navigation => self.network_first_navigation(request).await,
            Strategy::CacheFirst => self.cache_first(request).await,
        }
    }

    fn lookup(&self, url: &str) -> Option<Response> {
        match self.caches.match_any(url) {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "Worker cache lookup failed");
                None
            }
        }
    }

    fn store(&self, namespace: &str, url: &str, response: &Response) {
        let stored = self
            .caches
            .open_namespace(namespace)
            .and_then(|ns| ns.put(url, response));
        if let Err(e) = stored {
            warn!(namespace, url, error = %e, "Failed to cache response");
        }
    }

    fn offline_response(&self) -> Response {
        Response::json(
            200,
            &serde_json::json!({
                "error": true,
                "message": self.config.offline_notice,
            }),
        )
    }

    async fn network_first_api(&self, request: Request) -> Result<Response, TransportError> {
        let url = request.url.clone();
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.store(&self.config.api_cache_name, &url, &response);
                }
                Ok(response)
            }
            Err(e) => {
                debug!(url = %url, error = %e, "API request failed, trying worker cache");
                Ok(self.lookup(&url).unwrap_or_else(|| self.offline_response()))
            }
        }
    }

    fn app_shell_url(&self, request_url: &str) -> Option<String> {
        let base = Url::parse(request_url).ok()?;
        base.join(&self.config.app_shell_url).ok().map(String::from)
    }

    async fn network_first_navigation(&self, request: Request) -> Result<Response, TransportError> {
        let url = request.url.clone();
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.store(&self.config.static_cache_name, &url, &response);
                }
                Ok(response)
            }
            Err(e) => {
                let shell = self.app_shell_url(&url).and_then(|shell| self.lookup(&shell));
                match shell {
                    Some(response) => {
                        debug!(url = %url, "Navigation failed, serving app shell");
                        Ok(response)
                    }
                    None => Err(e),
                }
            }
        }
    }

    async fn cache_first(&self, request: Request) -> Result<Response, TransportError> {
        if let Some(cached) = self.lookup(&request.url) {
            return Ok(cached);
        }

        let url = request.url.clone();
        let response = self.network.fetch(request).await?;
        if response.is_success() {
            self.store(&self.config.static_cache_name, &url, &response);
        }
        Ok(response)
    }

    /// Show the notification for an incoming push message
    pub async fn handle_push(
        &self,
        data: Option<&[u8]>,
        sink: &dyn NotificationSink,
    ) -> Result<Notification, WorkerError> {
        push::handle_push(data, &self.notifications, sink).await
    }

    pub async fn handle_notification_click(
        &self,
        notification: &Notification,
        clients: &dyn ClientWindows,
    ) -> Result<ClickOutcome, WorkerError> {
        push::handle_notification_click(notification, clients).await
    }
}

#[async_trait]
impl Transport for ServiceWorker {
    async fn fetch(&self, request: Request) -> Result<Response, TransportError> {
        self.handle_fetch(request).await
    }
}
