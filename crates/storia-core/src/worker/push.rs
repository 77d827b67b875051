//! Push messages and notification clicks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::WorkerError;

pub const DEFAULT_NOTIFICATION_TITLE: &str = "Story created";
pub const DEFAULT_NOTIFICATION_BODY: &str = "You created a new story.";

/// URL opened when a clicked notification carries none
const DEFAULT_CLICK_URL: &str = "/";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    #[serde(default)]
    pub data: NotificationData,
}

/// Fallback text and icon for notifications
#[derive(Debug, Clone)]
pub struct NotificationDefaults {
    pub title: String,
    pub body: String,
    pub icon: String,
}

impl NotificationDefaults {
    pub fn new(icon: impl Into<String>) -> Self {
        Self {
            title: DEFAULT_NOTIFICATION_TITLE.to_string(),
            body: DEFAULT_NOTIFICATION_BODY.to_string(),
            icon: icon.into(),
        }
    }

    pub fn notification(&self) -> Notification {
        Notification {
            title: self.title.clone(),
            body: self.body.clone(),
            icon: self.icon.clone(),
            data: NotificationData::default(),
        }
    }
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Build the notification for a push message.
///
/// Absent or malformed payloads behave like `{}`.
pub fn build_notification(data: Option<&[u8]>, defaults: &NotificationDefaults) -> Notification {
    let payload = match data {
        Some(bytes) => serde_json::from_slice::<Value>(bytes).unwrap_or_else(|e| {
            warn!(error = %e, "Malformed push payload");
            Value::Object(Default::default())
        }),
        None => Value::Object(Default::default()),
    };
    let options = payload.get("options").cloned().unwrap_or(Value::Null);

    let title = non_empty_str(&payload, "title").unwrap_or(defaults.title.as_str());
    let body = match non_empty_str(&payload, "description") {
        Some(description) => format!(
            "You created a new story with the description: {}",
            description
        ),
        None => non_empty_str(&options, "body")
            .unwrap_or(defaults.body.as_str())
            .to_string(),
    };
    let icon = non_empty_str(&options, "icon").unwrap_or(defaults.icon.as_str());
    let url = options
        .get("data")
        .and_then(|data| non_empty_str(data, "url"))
        .or_else(|| non_empty_str(&payload, "url"));

    Notification {
        title: title.to_string(),
        body,
        icon: icon.to_string(),
        data: NotificationData {
            url: url.map(str::to_string),
        },
    }
}

/// Where notifications are displayed
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<(), WorkerError>;
}

/// Open application windows
#[async_trait]
pub trait ClientWindows: Send + Sync {
    /// Ids of open windows, most recently focused first
    async fn windows(&self) -> Vec<String>;
    async fn focus(&self, window_id: &str) -> Result<(), WorkerError>;
    async fn open(&self, url: &str) -> Result<(), WorkerError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Focused(String),
    Opened(String),
}

/// Show the notification for a push message, falling back to the default
/// notification if the sink refuses the built one.
pub async fn handle_push(
    data: Option<&[u8]>,
    defaults: &NotificationDefaults,
    sink: &dyn NotificationSink,
) -> Result<Notification, WorkerError> {
    let notification = build_notification(data, defaults);
    debug!(title = %notification.title, "Showing push notification");

    match sink.show(&notification).await {
        Ok(()) => Ok(notification),
        Err(e) => {
            warn!(error = %e, "Failed to show notification, using defaults");
            let fallback = defaults.notification();
            sink.show(&fallback).await?;
            Ok(fallback)
        }
    }
}

/// Focus the first open window, or open one at the notification's URL
pub async fn handle_notification_click(
    notification: &Notification,
    clients: &dyn ClientWindows,
) -> Result<ClickOutcome, WorkerError> {
    if let Some(window_id) = clients.windows().await.into_iter().next() {
        clients.focus(&window_id).await?;
        return Ok(ClickOutcome::Focused(window_id));
    }

    let url = notification
        .data
        .url
        .as_deref()
        .unwrap_or(DEFAULT_CLICK_URL);
    clients.open(url).await?;
    Ok(ClickOutcome::Opened(url.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn defaults() -> NotificationDefaults {
        NotificationDefaults::new("/icons/S-192.png")
    }

    #[test]
    fn test_description_builds_body() {
        let data = br#"{"title":"New story","description":"Sunset","url":"/stories/story-1"}"#;
        let n = build_notification(Some(data), &defaults());
        assert_eq!(n.title, "New story");
        assert_eq!(n.body, "You created a new story with the description: Sunset");
        assert_eq!(n.icon, "/icons/S-192.png");
        assert_eq!(n.data.url.as_deref(), Some("/stories/story-1"));
    }

    #[test]
    fn test_options_body_and_icon() {
        let data = br#"{"options":{"body":"Hello","icon":"/custom.png"}}"#;
        let n = build_notification(Some(data), &defaults());
        assert_eq!(n.title, DEFAULT_NOTIFICATION_TITLE);
        assert_eq!(n.body, "Hello");
        assert_eq!(n.icon, "/custom.png");
        assert_eq!(n.data.url, None);
    }

    #[test]
    fn test_click_url_from_options_data() {
        let data = br#"{"title":"Story created","options":{"body":"hi","data":{"url":"/stories/story-1"}}}"#;
        let n = build_notification(Some(data), &defaults());
        assert_eq!(n.body, "hi");
        assert_eq!(n.data.url.as_deref(), Some("/stories/story-1"));

        // Nested url wins over the top-level one
        let data = br#"{"url":"/top","options":{"data":{"url":"/nested"}}}"#;
        let n = build_notification(Some(data), &defaults());
        assert_eq!(n.data.url.as_deref(), Some("/nested"));

        let data = br#"{"url":"/top","options":{"data":{}}}"#;
        let n = build_notification(Some(data), &defaults());
        assert_eq!(n.data.url.as_deref(), Some("/top"));
    }

    #[test]
    fn test_absent_or_malformed_payload() {
        assert_eq!(build_notification(None, &defaults()), defaults().notification());
        assert_eq!(
            build_notification(Some(b"not json"), &defaults()),
            defaults().notification()
        );
        assert_eq!(
            build_notification(Some(b"[1,2]"), &defaults()),
            defaults().notification()
        );
    }

    struct RecordingSink {
        fail_first: bool,
        shown: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn show(&self, notification: &Notification) -> Result<(), WorkerError> {
            let mut shown = self.shown.lock().unwrap();
            shown.push(notification.clone());
            if self.fail_first && shown.len() == 1 {
                return Err(WorkerError::Client("display refused".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_handle_push_falls_back_to_defaults() {
        let sink = RecordingSink {
            fail_first: true,
            shown: Mutex::new(Vec::new()),
        };
        let shown = handle_push(Some(br#"{"title":"X"}"#), &defaults(), &sink)
            .await
            .unwrap();
        assert_eq!(shown, defaults().notification());
        assert_eq!(sink.shown.lock().unwrap().len(), 2);
    }

    struct FakeWindows {
        open_windows: Vec<String>,
        actions: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ClientWindows for FakeWindows {
        async fn windows(&self) -> Vec<String> {
            self.open_windows.clone()
        }

        async fn focus(&self, window_id: &str) -> Result<(), WorkerError> {
            self.actions.lock().unwrap().push(format!("focus {}", window_id));
            Ok(())
        }

        async fn open(&self, url: &str) -> Result<(), WorkerError> {
            self.actions.lock().unwrap().push(format!("open {}", url));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_click_focuses_first_window() {
        let clients = FakeWindows {
            open_windows: vec!["w1".to_string(), "w2".to_string()],
            actions: Mutex::new(Vec::new()),
        };
        let outcome = handle_notification_click(&defaults().notification(), &clients)
            .await
            .unwrap();
        assert_eq!(outcome, ClickOutcome::Focused("w1".to_string()));
        assert_eq!(*clients.actions.lock().unwrap(), vec!["focus w1"]);
    }

    #[tokio::test]
    async fn test_click_opens_url_without_windows() {
        let clients = FakeWindows {
            open_windows: Vec::new(),
            actions: Mutex::new(Vec::new()),
        };

        let mut notification = defaults().notification();
        let outcome = handle_notification_click(&notification, &clients).await.unwrap();
        assert_eq!(outcome, ClickOutcome::Opened("/".to_string()));

        notification.data.url = Some("/stories/story-1".to_string());
        let outcome = handle_notification_click(&notification, &clients).await.unwrap();
        assert_eq!(outcome, ClickOutcome::Opened("/stories/story-1".to_string()));
    }
}
