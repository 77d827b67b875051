//! Application wiring for the storia CLI.
//!
//! `App` owns the configuration, the session, the single record store,
//! the interception worker and the API client built on top of them.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use storia_core::api::connectivity::{is_reachable, poll_reachability, reachability_target};
use storia_core::api::{ApiClient, ConnectivityMonitor, NetworkTransport};
use storia_core::auth::{Session, SessionData};
use storia_core::cache::{CacheManager, CacheStore};
use storia_core::config::Config;
use storia_core::models::{NewStory, PhotoUpload, PushSubscription, SubscriptionKeys};
use storia_core::worker::{
    ClickOutcome, ClientWindows, Notification, NotificationSink, ServiceWorker, WorkerError,
};

use crate::output;

/// Lets scripts log in without a prompt
const PASSWORD_ENV: &str = "STORIA_PASSWORD";

/// Feed page to show
#[derive(Debug, Clone, Copy)]
pub struct PageArgs {
    pub page: u32,
    pub size: u32,
    pub location: u8,
}

pub struct App {
    config: Config,
    session: Session,
    api: ApiClient,
    worker: Arc<ServiceWorker>,
    connectivity: Arc<ConnectivityMonitor>,
}

impl App {
    pub async fn new(force_offline: bool) -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let cache_dir = config.cache_dir()?;
        debug!(?cache_dir, "Cache directory configured");

        let store = Arc::new(CacheStore::open(&cache_dir).context("Failed to open cache store")?);
        let network = Arc::new(NetworkTransport::new(config.request_timeout_secs)?);

        let worker = Arc::new(ServiceWorker::new(config.worker_config(), network, &cache_dir)?);
        if let Err(e) = worker.start().await {
            // A failed worker passes requests straight through
            warn!(error = %e, "Worker did not activate");
        }

        let connectivity = Arc::new(ConnectivityMonitor::new(!force_offline));
        if !force_offline {
            if let Some((host, port)) = reachability_target(&config.api_base_url) {
                connectivity.set_online(is_reachable(&host, port).await);
            }
        }

        let mut api = ApiClient::new(
            worker.clone(),
            store,
            connectivity.clone(),
            config.api_base_url.clone(),
        )
        .with_offline_notice(config.offline_notice.clone());

        let mut session = Session::new(Config::config_dir()?);
        if let Err(e) = session.load() {
            warn!(error = %e, "Ignoring unreadable session");
        }
        if let Some(token) = session.token() {
            api.set_token(token.to_string());
        }

        Ok(Self {
            config,
            session,
            api,
            worker,
            connectivity,
        })
    }

    fn cache(&self) -> CacheManager {
        self.api.cache()
    }

    fn prompt(label: &str) -> Result<String> {
        print!("{}: ", label);
        io::stdout().flush()?;

        let mut value = String::new();
        io::stdin().read_line(&mut value)?;
        Ok(value.trim().to_string())
    }

    fn prompt_password() -> Result<String> {
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            return Ok(password);
        }
        Ok(rpassword::prompt_password("Password: ")?)
    }

    // ===== Accounts =====

    pub async fn register(&self, name: &str, email: &str) -> Result<()> {
        let password = Self::prompt_password()?;
        let response = self.api.register(name, email, &password).await?;
        println!("{}", response.message.as_deref().unwrap_or("Account created"));
        Ok(())
    }

    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email.or_else(|| self.config.last_email.clone()) {
            Some(email) => email,
            None => Self::prompt("Email")?,
        };
        let password = Self::prompt_password()?;

        let login = self.api.login(&email, &password).await?;

        self.session
            .update(SessionData::new(login.token, login.name.clone(), login.user_id));
        self.session.save()?;

        if let Err(e) = self.config.remember_email(&email) {
            warn!(error = %e, "Failed to save config");
        }

        info!("Login successful");
        println!("Logged in as {}", login.name);
        Ok(())
    }

    pub fn logout(&mut self) -> Result<()> {
        self.api.clear_token();
        self.session.clear()?;
        println!("Logged out");
        Ok(())
    }

    // ===== Stories =====

    pub async fn stories(&self, page: PageArgs) -> Result<()> {
        let response = self
            .api
            .fetch_stories(page.page, page.size, page.location)
            .await?;
        output::print_listing(&response);
        Ok(())
    }

    pub async fn story(&self, id: &str) -> Result<()> {
        let response = self.api.fetch_story_detail(id).await?;
        output::print_detail(&response);
        Ok(())
    }

    pub async fn add_story(
        &self,
        description: String,
        photo: &Path,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> Result<()> {
        let photo = PhotoUpload::from_path(photo)
            .with_context(|| format!("Failed to read photo {}", photo.display()))?;
        let story = NewStory {
            description,
            photo,
            lat,
            lon,
        };

        let response = self.api.add_story(&story).await?;
        println!("{}", response.message.as_deref().unwrap_or("Story created"));
        Ok(())
    }

    pub fn offline(&self, page: PageArgs) -> Result<()> {
        let stories = self
            .cache()
            .offline_stories(page.page, page.size, page.location)?;
        output::print_cached_stories(&stories);
        Ok(())
    }

    // ===== Cache =====

    pub fn cache_list(&self) -> Result<()> {
        output::print_entries(&self.cache().cached_entries()?);

        let caches = self.worker.caches();
        for name in caches.keys()? {
            let urls = caches.open_namespace(&name)?.urls()?;
            println!("\n{} ({} responses)", name, urls.len());
            for url in urls {
                println!("  {}", url);
            }
        }
        Ok(())
    }

    pub fn cache_delete(&self, key: &str, story_id: Option<&str>) -> Result<()> {
        match story_id {
            Some(story_id) => {
                let removed = self.cache().delete_story_from_cache(key, story_id)?;
                println!("Removed \"{}\" from {}", removed.name, key);
            }
            None => {
                self.cache().delete_offline_story(key)?;
                println!("Deleted {}", key);
            }
        }
        Ok(())
    }

    // ===== Push =====

    pub async fn subscribe(&self, endpoint: String, p256dh: String, auth: String) -> Result<()> {
        let subscription = PushSubscription {
            endpoint,
            keys: SubscriptionKeys { p256dh, auth },
        };
        let response = self.api.subscribe(&subscription).await?;
        println!("{}", response.message.as_deref().unwrap_or("Subscribed"));
        Ok(())
    }

    pub async fn unsubscribe(&self, endpoint: &str) -> Result<()> {
        let response = self.api.unsubscribe(endpoint).await?;
        println!("{}", response.message.as_deref().unwrap_or("Unsubscribed"));
        Ok(())
    }

    /// Show the notification a push message would produce, then click it
    pub async fn notify(&self, data: Option<&str>) -> Result<()> {
        let notification = self
            .worker
            .handle_push(data.map(str::as_bytes), &TerminalSink)
            .await?;

        match self
            .worker
            .handle_notification_click(&notification, &TerminalWindows)
            .await?
        {
            ClickOutcome::Focused(window) => println!("Focused window {}", window),
            ClickOutcome::Opened(url) => println!("Opened {}", url),
        }
        Ok(())
    }

    // ===== Connectivity =====

    /// Follow connectivity changes: reload the feed when the API comes back,
    /// show the saved feed when it goes away.
    pub async fn watch(&self, page: PageArgs, interval_secs: u64) -> Result<()> {
        let (host, port) = reachability_target(&self.config.api_base_url)
            .with_context(|| format!("Cannot probe {}", self.config.api_base_url))?;

        let mut changes = self.connectivity.subscribe();
        let poller = tokio::spawn(poll_reachability(
            self.connectivity.clone(),
            host,
            port,
            Duration::from_secs(interval_secs),
        ));

        println!("Watching connectivity, press Ctrl-C to stop");
        loop {
            tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let online = *changes.borrow_and_update();
                    self.on_connectivity_change(online, page).await;
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        poller.abort();
        Ok(())
    }

    async fn on_connectivity_change(&self, online: bool, page: PageArgs) {
        if online {
            println!("\nBack online, reloading stories");
            match self
                .api
                .fetch_stories(page.page, page.size, page.location)
                .await
            {
                Ok(response) => output::print_listing(&response),
                Err(e) => eprintln!("Could not reload stories: {}", e),
            }
        } else {
            println!("\nOffline, showing saved stories");
            match self
                .cache()
                .offline_stories(page.page, page.size, page.location)
            {
                Ok(stories) => output::print_cached_stories(&stories),
                Err(e) => eprintln!("Could not read saved stories: {}", e),
            }
        }
    }
}

/// Prints notifications to stdout
struct TerminalSink;

#[async_trait]
impl NotificationSink for TerminalSink {
    async fn show(&self, notification: &Notification) -> Result<(), WorkerError> {
        output::print_notification(notification);
        Ok(())
    }
}

/// A terminal has no app windows; "opening" one just reports the URL
struct TerminalWindows;

#[async_trait]
impl ClientWindows for TerminalWindows {
    async fn windows(&self) -> Vec<String> {
        Vec::new()
    }

    async fn focus(&self, window_id: &str) -> Result<(), WorkerError> {
        Err(WorkerError::Client(format!("no window {}", window_id)))
    }

    async fn open(&self, _url: &str) -> Result<(), WorkerError> {
        Ok(())
    }
}
