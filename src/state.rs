//! Application state management
//!
//! This module defines the AppState structure that holds:
//! - Bot configuration (admin allow-list, limits, proxy)
//! - Catalog stores
//! - Telegram API client

use chrono::{Local, NaiveDateTime};
use std::time::Instant;

use crate::catalog::Catalog;
use crate::config::{BotConfig, TelegramMode};
use crate::error::Result;
use crate::telegram::TelegramClient;

/// Application state shared across all handlers
pub struct AppState {
    /// Bot configuration
    pub config: BotConfig,

    /// Channel, VOD and customer collections
    pub catalog: Catalog,

    /// Bot API client, absent when Telegram is disabled
    pub telegram: Option<TelegramClient>,

    /// Process start time
    pub started_at: Instant,
}

impl AppState {
    /// Create a new AppState with the given configuration
    pub fn new(config: BotConfig) -> Result<Self> {
        let telegram = match (&config.telegram.mode, &config.telegram.bot_token) {
            (TelegramMode::Disabled, _) | (_, None) => None,
            (_, Some(token)) => Some(TelegramClient::new(
                &config.telegram.api_base_url,
                token,
                config.telegram.poll_timeout_secs,
            )?),
        };

        Ok(Self {
            catalog: Catalog::open(&config.storage),
            telegram,
            started_at: Instant::now(),
            config,
        })
    }

    /// Create AppState without a Telegram connection
    pub fn offline(config: BotConfig) -> Self {
        Self {
            catalog: Catalog::open(&config.storage),
            telegram: None,
            started_at: Instant::now(),
            config,
        }
    }

    /// Current server time as stored in catalog records
    pub fn now() -> NaiveDateTime {
        Local::now().naive_local()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
