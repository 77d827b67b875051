//! Online/offline state.
//!
//! Components read connectivity through `ConnectivityProbe`; only the owner
//! of the `ConnectivityMonitor` changes it, by calling `set_online` when the
//! environment reports a transition. Transitions are broadcast on a watch
//! channel so listeners can react (reload the feed, show cached stories).

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, info};
use url::Url;

/// How long a reachability check may take before the host counts as down
const CONNECT_TIMEOUT_SECS: u64 = 5;

pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

pub struct ConnectivityMonitor {
    state: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    pub fn new(online: bool) -> Self {
        let (state, _) = watch::channel(online);
        Self { state }
    }

    /// Record a connectivity transition. Returns true if the state changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!(online, "Connectivity changed");
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityProbe for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        *self.state.borrow()
    }
}

/// Host and port to probe for an API base URL
pub fn reachability_target(base_url: &str) -> Option<(String, u16)> {
    let url = Url::parse(base_url).ok()?;
    let host = url.host_str()?.to_string();
    let port = url.port_or_known_default()?;
    Some((host, port))
}

/// Whether a TCP connection to `host:port` can be opened
pub async fn is_reachable(host: &str, port: u16) -> bool {
    let connect = TcpStream::connect((host, port));
    match tokio::time::timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS), connect).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!(host, port, error = %e, "Reachability check failed");
            false
        }
        Err(_) => {
            debug!(host, port, "Reachability check timed out");
            false
        }
    }
}

/// Poll the API host forever, translating reachability into transitions.
pub async fn poll_reachability(
    monitor: Arc<ConnectivityMonitor>,
    host: String,
    port: u16,
    interval: Duration,
) {
    loop {
        let online = is_reachable(&host, port).await;
        monitor.set_online(online);
        tokio::time::sleep(interval).await;
    }
}
