//! Test fixtures for integration tests
//!
//! Builds scratch deployments and canned Telegram updates.

use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tempfile::TempDir;

use crate::bot::{Content, Incoming, Upload};
use crate::catalog::StorageFormat;
use crate::config::BotConfig;
use crate::state::AppState;

pub const ADMIN_ID: i64 = 7001;
pub const USER_ID: i64 = 7002;

/// A bot deployment backed by a temporary data directory
pub struct TestBot {
    pub dir: TempDir,
    pub state: Arc<AppState>,
}

impl TestBot {
    pub fn new(format: StorageFormat) -> Self {
        Self::with_config(format, |_| {})
    }

    pub fn with_config<F: FnOnce(&mut BotConfig)>(format: StorageFormat, customize: F) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let mut config = BotConfig::default();
        config.admin_ids = vec![ADMIN_ID];
        config.storage.data_dir = dir.path().to_path_buf();
        config.storage.format = format;
        customize(&mut config);
        let state = Arc::new(AppState::offline(config));
        Self { dir, state }
    }

    /// Reopen the same data directory, as after a restart
    pub fn restart(&self) -> Arc<AppState> {
        Arc::new(AppState::offline(self.state.config.clone()))
    }
}

/// Fixed clock used by the flows
pub fn clock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 9, 1)
        .unwrap()
        .and_hms_opt(20, 15, 30)
        .unwrap()
}

pub fn text_from(user_id: i64, text: &str) -> Incoming {
    Incoming {
        chat_id: user_id,
        user_id: Some(user_id),
        content: Content::Text(text.to_string()),
        caption: None,
    }
}

pub fn video_from(user_id: i64, file_id: &str, caption: Option<&str>) -> Incoming {
    Incoming {
        chat_id: user_id,
        user_id: Some(user_id),
        content: Content::Video(Upload {
            file_id: file_id.to_string(),
            file_name: Some(format!("{}.mp4", file_id.to_lowercase())),
            mime_type: Some("video/mp4".to_string()),
        }),
        caption: caption.map(str::to_string),
    }
}

/// Channel commands for a small mixed catalog: 3 News, 2 Sports
pub fn news_and_sports() -> Vec<String> {
    [
        ("BBC", "News"),
        ("CNN", "News"),
        ("ESPN", "Sports"),
        ("Euronews", "News"),
        ("Eurosport", "Sports"),
    ]
    .iter()
    .map(|(name, group)| {
        format!(
            "/add {} http://streams.example/{}/index.m3u8 {}",
            name,
            name.to_lowercase(),
            group
        )
    })
    .collect()
}
