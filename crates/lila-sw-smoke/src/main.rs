//! lila-sw smoke harness
//!
//! Drives the background agent from the command line against in-memory host
//! capabilities and the real network, printing what happened as JSON.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use lila_sw::host::{
    ClientAction, MemoryCacheStorage, MemoryClients, MemoryNotifications, MemoryRegistration,
};
use lila_sw::{
    CacheStorage, Client, Dispatcher, Host, Notification, NotificationCenter, Request,
    RouteOutcome, WorkerConfig,
};
use lila_sw_common::logging::{init_logging, LogConfig};
use lila_sw_net::{HttpNetwork, NetworkConfig};
use serde::Serialize;
use serde_json::json;
use tracing::{info, Level};
use url::Url;

const DEFAULT_REGISTRATION_URL: &str =
    "https://lichess.org/service-worker.js?asset-url=https://lichess1.org/";

#[derive(Parser, Debug)]
#[command(name = "lila-sw-smoke", version, about = "Exercise the lila background agent")]
struct Args {
    /// URL the agent was registered with
    #[arg(long, default_value = DEFAULT_REGISTRATION_URL)]
    registration_url: Url,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON log lines on stderr
    #[arg(long)]
    json_logs: bool,

    /// Log filter directives, e.g. "lila_sw=trace,reqwest=warn"
    #[arg(long)]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Install, activate, then fetch a URL through the cache gate
    Fetch {
        url: Url,

        /// Number of fetches
        #[arg(long, default_value_t = 2)]
        repeat: u32,
    },
    /// Deliver a push message and print the notification shown
    Push {
        /// Push message JSON
        message: String,
    },
    /// Show a notification carrying the given data, then click it
    Click {
        /// Notification data JSON, e.g. '{"userData":{"fullId":"abc"}}'
        data: String,

        /// Open window, as a path or URL; repeatable
        #[arg(long = "window")]
        windows: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
struct FetchReport {
    attempt: u32,
    status: u16,
    from_cache: bool,
    bytes: usize,
    elapsed_ms: f64,
}

#[derive(Debug, Serialize)]
struct ClickReport {
    outcome: RouteOutcome,
    actions: Vec<ClientAction>,
    remaining_notifications: usize,
}

struct Harness {
    dispatcher: Dispatcher,
    caches: Arc<MemoryCacheStorage>,
    clients: Arc<MemoryClients>,
    notifications: Arc<MemoryNotifications>,
}

impl Harness {
    fn new(registration_url: &Url, windows: Vec<Client>) -> Result<Self> {
        let config = WorkerConfig::from_registration_url(registration_url)
            .context("invalid registration URL")?;
        let network =
            HttpNetwork::new(NetworkConfig::default()).context("failed to create network")?;

        let caches = Arc::new(MemoryCacheStorage::new());
        let clients = Arc::new(MemoryClients::with_clients(windows));
        let notifications = Arc::new(MemoryNotifications::new());

        let host = Host {
            caches: caches.clone(),
            clients: clients.clone(),
            notifications: notifications.clone(),
            registration: Arc::new(MemoryRegistration::new()),
            network: Arc::new(network),
        };

        Ok(Self {
            dispatcher: Dispatcher::new(config, host),
            caches,
            clients,
            notifications,
        })
    }
}

fn log_config(args: &Args) -> LogConfig {
    let config = match (args.json_logs, args.verbose) {
        (true, true) => LogConfig {
            level: Level::DEBUG,
            ..LogConfig::production()
        },
        (true, false) => LogConfig::production(),
        (false, true) => LogConfig::debug(),
        (false, false) => LogConfig::default(),
    };
    match &args.log_filter {
        Some(filter) => config.with_filter(filter.clone()),
        None => config,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(log_config(&args))?;

    info!(registration_url = %args.registration_url, "Starting lila-sw smoke harness");

    let report = match args.command {
        Command::Fetch { url, repeat } => fetch(&args.registration_url, url, repeat).await?,
        Command::Push { message } => push(&args.registration_url, message).await?,
        Command::Click { data, windows } => click(&args.registration_url, &data, &windows).await?,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn fetch(registration_url: &Url, url: Url, repeat: u32) -> Result<serde_json::Value> {
    let harness = Harness::new(registration_url, Vec::new())?;
    let dispatcher = &harness.dispatcher;

    dispatcher.install().settled().await?;
    let pruned = dispatcher.activate().settled().await?;

    let mut fetches = Vec::new();
    for attempt in 1..=repeat.max(1) {
        let start = Instant::now();
        let response = dispatcher
            .fetch(Request::get(url.clone()))
            .settled()
            .await
            .with_context(|| format!("fetch {url} failed"))?;
        // Let the background store finish before the next attempt.
        dispatcher.settled().await;

        fetches.push(FetchReport {
            attempt,
            status: response.status.as_u16(),
            from_cache: response.from_cache,
            bytes: response.body_len(),
            elapsed_ms: (start.elapsed().as_secs_f64() * 100_000.0).round() / 100.0,
        });
    }

    let mut stores = serde_json::Map::new();
    for key in harness.caches.keys().await? {
        let entries = harness.caches.entry_count(&key).await.unwrap_or(0);
        stores.insert(key, json!(entries));
    }

    Ok(json!({
        "url": url,
        "state": dispatcher.state().await,
        "pruned": pruned,
        "fetches": fetches,
        "caches": stores,
    }))
}

async fn push(registration_url: &Url, message: String) -> Result<serde_json::Value> {
    let harness = Harness::new(registration_url, Vec::new())?;
    let shown: Notification = harness
        .dispatcher
        .push(Some(Bytes::from(message)))
        .settled()
        .await
        .context("push was not shown")?;
    Ok(serde_json::to_value(shown)?)
}

async fn click(registration_url: &Url, data: &str, windows: &[String]) -> Result<serde_json::Value> {
    let payload: serde_json::Value =
        serde_json::from_str(data).context("notification data is not JSON")?;

    let origin = WorkerConfig::from_registration_url(registration_url)?.origin;
    let windows = windows
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let url = origin
                .join(w)
                .with_context(|| format!("invalid window {w}"))?;
            Ok(Client::window(format!("window-{}", i + 1), url))
        })
        .collect::<Result<Vec<_>>>()?;

    let harness = Harness::new(registration_url, windows)?;
    let message = json!({ "title": "lichess.org", "payload": payload });
    let shown = harness
        .dispatcher
        .push(Some(Bytes::from(message.to_string())))
        .settled()
        .await?;

    let outcome = harness.dispatcher.notification_click(shown).settled().await?;
    harness.dispatcher.settled().await;

    let report = ClickReport {
        outcome,
        actions: harness.clients.actions().await,
        remaining_notifications: harness.notifications.get_all().await?.len(),
    };
    Ok(serde_json::to_value(report)?)
}
