//! storia - share photo stories from the terminal, even when offline.
//!
//! Stories fetched while online are kept on disk and shown again when the
//! Story API cannot be reached.

mod app;
mod output;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, PageArgs};
use storia_core::api::ApiError;
use storia_core::ErrorKind;

/// Default seconds between reachability checks in `watch`
const DEFAULT_WATCH_INTERVAL_SECS: u64 = 10;

#[derive(Parser)]
#[command(name = "storia", version, about = "Share photo stories, even when offline")]
struct Cli {
    /// Treat the Story API as unreachable
    #[arg(long, global = true)]
    offline: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Copy)]
struct PageOpts {
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, default_value_t = 10)]
    size: u32,
    /// Only stories posted with a location
    #[arg(long)]
    location: bool,
}

impl From<PageOpts> for PageArgs {
    fn from(opts: PageOpts) -> Self {
        PageArgs {
            page: opts.page,
            size: opts.size,
            location: u8::from(opts.location),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Log in and remember the session
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    Logout,
    /// Show a page of the story feed
    Stories(PageOpts),
    /// Show one story
    Story { id: String },
    /// Post a new story
    Add {
        #[arg(long)]
        description: String,
        #[arg(long, value_name = "FILE")]
        photo: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<f64>,
    },
    /// Show the stories saved for a feed page, without the network
    Offline(PageOpts),
    /// Inspect or prune the offline cache
    #[command(subcommand)]
    Cache(CacheCommand),
    /// Register a push subscription
    Subscribe {
        #[arg(long)]
        endpoint: String,
        #[arg(long)]
        p256dh: String,
        #[arg(long)]
        auth: String,
    },
    Unsubscribe {
        #[arg(long)]
        endpoint: String,
    },
    /// Reload the feed on reconnect, show saved stories on disconnect
    Watch {
        #[command(flatten)]
        page: PageOpts,
        /// Seconds between reachability checks
        #[arg(long, default_value_t = DEFAULT_WATCH_INTERVAL_SECS)]
        interval: u64,
    },
    /// Show the notification for a push payload (JSON)
    Notify { data: Option<String> },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// List cached entries and worker caches
    List,
    /// Delete a cache entry, or one story from it
    Delete {
        key: String,
        #[arg(long)]
        story: Option<String>,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {}", path.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

/// Message for the user, by failure kind
fn user_message(err: &anyhow::Error) -> String {
    let Some(api) = err.downcast_ref::<ApiError>() else {
        return format!("{:#}", err);
    };

    match api.kind() {
        ErrorKind::NoCachedData => {
            "You are offline and nothing has been saved for this view yet.".to_string()
        }
        ErrorKind::CacheExpired => {
            "You are offline and the saved copy is more than a day old.".to_string()
        }
        ErrorKind::NetworkFailure => format!("Unable to reach the Story API: {}", api),
        ErrorKind::Offline => "You are offline.".to_string(),
        _ => api.to_string(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut app = App::new(cli.offline).await?;

    match cli.command {
        Command::Register { name, email } => app.register(&name, &email).await,
        Command::Login { email } => app.login(email).await,
        Command::Logout => app.logout(),
        Command::Stories(page) => app.stories(page.into()).await,
        Command::Story { id } => app.story(&id).await,
        Command::Add {
            description,
            photo,
            lat,
            lon,
        } => app.add_story(description, &photo, lat, lon).await,
        Command::Offline(page) => app.offline(page.into()),
        Command::Cache(CacheCommand::List) => app.cache_list(),
        Command::Cache(CacheCommand::Delete { key, story }) => {
            app.cache_delete(&key, story.as_deref())
        }
        Command::Subscribe {
            endpoint,
            p256dh,
            auth,
        } => app.subscribe(endpoint, p256dh, auth).await,
        Command::Unsubscribe { endpoint } => app.unsubscribe(&endpoint).await,
        Command::Watch { page, interval } => app.watch(page.into(), interval).await,
        Command::Notify { data } => app.notify(data.as_deref()).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let _guard = match init_tracing(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(2);
        }
    };
    info!("storia starting");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", user_message(&e));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let cli = Cli::try_parse_from(["storia", "stories"]).unwrap();
        let Command::Stories(opts) = cli.command else {
            panic!("expected stories command");
        };
        let page = PageArgs::from(opts);
        assert_eq!((page.page, page.size, page.location), (1, 10, 0));
    }

    #[test]
    fn test_global_flags_and_location() {
        let cli = Cli::try_parse_from(["storia", "offline", "--page", "2", "--location", "--offline"])
            .unwrap();
        assert!(cli.offline);
        let Command::Offline(opts) = cli.command else {
            panic!("expected offline command");
        };
        let page = PageArgs::from(opts);
        assert_eq!((page.page, page.location), (2, 1));
    }

    #[test]
    fn test_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "storia", "add", "--description", "Sunset", "--photo", "sunset.jpg", "--lat", "-6.2",
            "--lon", "106.8",
        ])
        .unwrap();
        let Command::Add { lat, lon, .. } = cli.command else {
            panic!("expected add command");
        };
        assert_eq!(lat, Some(-6.2));
        assert_eq!(lon, Some(106.8));
    }

    #[test]
    fn test_user_messages() {
        let err = anyhow::Error::new(ApiError::CacheExpired {
            cache_key: "stories-page1-size10-loc0".to_string(),
            age_hours: 30,
        });
        assert!(user_message(&err).contains("more than a day old"));

        let err = anyhow::Error::new(ApiError::OfflineWriteRejected);
        assert!(user_message(&err).starts_with("Cannot add a story while offline"));

        let err = anyhow::anyhow!("plain failure");
        assert_eq!(user_message(&err), "plain failure");
    }
}
