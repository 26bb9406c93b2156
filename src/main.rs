//! IPTV Catalog Bot
//!
//! A Telegram bot that lets administrators curate live channels and VOD
//! uploads, stored as flat JSON/CSV/JSONL files, and hands out personalised
//! M3U playlists on demand or through token-protected download links.

#![allow(dead_code)]

mod bot;
mod catalog;
mod config;
mod config_file;
mod error;
mod http;
#[cfg(test)]
mod integration;
mod playlist;
mod state;
mod telegram;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{BotConfig, TelegramMode};
use crate::error::{BotError, Result};
use crate::http::create_router;
use crate::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "iptv-bot";

#[derive(Parser, Debug)]
#[command(name = "iptv-bot", version, about = "Telegram IPTV catalog bot")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Write a default configuration file to this path and exit
    #[arg(long)]
    generate_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.generate_config {
        config_file::generate_default_config(path)
            .map_err(|e| BotError::Config(format!("{}: {}", path.display(), e)))?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    // Load configuration; logging is not up yet, so keep the error for later
    let (mut config, load_error) = if args.config.exists() {
        match config_file::ConfigFile::from_file(&args.config) {
            Ok(cf) => (cf.into_bot_config(), None),
            Err(e) => (BotConfig::default(), Some(e.to_string())),
        }
    } else {
        (BotConfig::default(), None)
    };
    let env_warnings = config.apply_env()?;

    init_logging(&config);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    for warning in &env_warnings {
        tracing::warn!("{}", warning);
    }
    if let Some(e) = load_error {
        tracing::warn!(
            "Failed to load config file {}: {}. Using defaults.",
            args.config.display(),
            e
        );
    }

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        return Err(e);
    }
    log_summary(&config);

    // Create application state
    let state = Arc::new(AppState::new(config.clone())?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
        }
        let _ = shutdown_tx.send(true);
    });

    let mut tasks = Vec::new();

    if config.http.enabled {
        let addr: SocketAddr = config
            .http
            .socket_addr()
            .parse()
            .map_err(|e| BotError::Config(format!("invalid listen address: {}", e)))?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Starting HTTP server on {}", addr);

        let app = create_router(state.clone());
        let rx = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(wait_for_shutdown(rx))
                .await;
            if let Err(e) = served {
                tracing::error!("HTTP server failed: {}", e);
            }
        }));
    }

    match (&config.telegram.mode, state.telegram.clone()) {
        (TelegramMode::Polling, Some(client)) => {
            let rx = shutdown_rx.clone();
            let state = state.clone();
            tasks.push(tokio::spawn(async move {
                telegram::run_polling(state, client, wait_for_shutdown(rx)).await;
            }));
        }
        (TelegramMode::Webhook, Some(client)) => match &config.http.public_url {
            Some(base) => {
                let url = format!("{}/webhook", base.trim_end_matches('/'));
                client
                    .set_webhook(&url, config.telegram.webhook_secret.as_deref())
                    .await?;
                tracing::info!("Webhook registered at {}", url);
            }
            None => tracing::warn!("Webhook mode without http.public_url; register the webhook manually"),
        },
        _ => tracing::info!("Telegram disabled"),
    }

    if tasks.is_empty() {
        tracing::warn!("Nothing to run: HTTP server and Telegram are both disabled");
    }
    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!("Task failed: {}", e);
        }
    }

    tracing::info!("{} stopped", APP_NAME);
    Ok(())
}

/// Resolve once the shutdown flag is raised
async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Log the effective configuration without credentials
fn log_summary(config: &BotConfig) {
    tracing::info!(
        "Configuration: {} admins, telegram={:?}, storage={} ({}), http={}, proxy={}",
        config.admin_ids.len(),
        config.telegram.mode,
        config.storage.data_dir.display(),
        config.storage.format.extension(),
        if config.http.enabled {
            config.http.socket_addr()
        } else {
            "off".to_string()
        },
        config
            .proxy
            .as_ref()
            .map(|p| p.base_url.as_str())
            .unwrap_or("off")
    );
}

/// Initialize logging with tracing
fn init_logging(config: &BotConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("iptv_bot={},tower_http=info", config.log_level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
