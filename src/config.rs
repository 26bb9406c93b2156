//! Bot configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::StorageFormat;
use crate::error::{BotError, Result};

/// How updates reach the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelegramMode {
    /// Long-poll `getUpdates`
    Polling,
    /// Receive updates on `POST /webhook`
    Webhook,
    /// No Telegram connection (HTTP playlist endpoint only)
    Disabled,
}

impl std::str::FromStr for TelegramMode {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "polling" => Ok(TelegramMode::Polling),
            "webhook" => Ok(TelegramMode::Webhook),
            "disabled" | "off" => Ok(TelegramMode::Disabled),
            other => Err(BotError::Config(format!("unknown telegram mode: {}", other))),
        }
    }
}

/// Telegram connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token (from `BOT_TOKEN`)
    #[serde(skip_serializing)]
    pub bot_token: Option<String>,

    /// Update delivery mode
    pub mode: TelegramMode,

    /// Long-poll timeout in seconds
    pub poll_timeout_secs: u64,

    /// Bot API base address
    pub api_base_url: String,

    /// Secret expected in `X-Telegram-Bot-Api-Secret-Token` on webhook calls
    pub webhook_secret: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            mode: TelegramMode::Polling,
            poll_timeout_secs: 30,
            api_base_url: "https://api.telegram.org".to_string(),
            webhook_secret: None,
        }
    }
}

/// Flat-file storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the catalog files
    pub data_dir: PathBuf,

    /// On-disk format of every collection
    pub format: StorageFormat,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            format: StorageFormat::Json,
        }
    }
}

impl StorageConfig {
    /// Path of the backing file for a collection
    pub fn collection_path(&self, kind: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", kind, self.format.extension()))
    }
}

/// Optional stream proxy used to turn VOD file handles into playable URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy base address
    pub base_url: String,

    /// Proxy credential
    #[serde(skip_serializing)]
    pub api_key: String,

    /// URL template with `{base}`, `{file_id}` and `{key}` placeholders
    pub url_template: String,
}

/// Default proxy URL layout
pub const DEFAULT_PROXY_TEMPLATE: &str = "{base}/proxy/telegram/{file_id}/stream.mp4?api_password={key}";

impl ProxyConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            url_template: DEFAULT_PROXY_TEMPLATE.to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Run the HTTP server
    pub enabled: bool,

    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Externally reachable base URL, used in customer playlist links
    pub public_url: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "0.0.0.0".to_string(),
            port: 8080,
            public_url: None,
        }
    }
}

impl HttpConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Public download link for a customer token
    pub fn playlist_url(&self, token: &str) -> Option<String> {
        self.public_url
            .as_ref()
            .map(|base| format!("{}/playlist/{}", base.trim_end_matches('/'), token))
    }
}

/// Bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Telegram user ids allowed to manage the catalog
    pub admin_ids: Vec<i64>,

    /// Maximum number of entries shown by list commands
    pub list_limit: usize,

    /// Telegram settings
    pub telegram: TelegramConfig,

    /// Storage settings
    pub storage: StorageConfig,

    /// HTTP settings
    pub http: HttpConfig,

    /// Optional VOD proxy
    pub proxy: Option<ProxyConfig>,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (pretty, json)
    pub log_format: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            admin_ids: Vec::new(),
            list_limit: 20,
            telegram: TelegramConfig::default(),
            storage: StorageConfig::default(),
            http: HttpConfig::default(),
            proxy: None,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl BotConfig {
    /// Check the admin allow-list
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    /// Apply environment overrides, returning warnings to log once logging is up
    pub fn apply_env(&mut self) -> Result<Vec<String>> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable lookup
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<Vec<String>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();

        if let Some(token) = lookup("BOT_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.telegram.bot_token = Some(token.trim().to_string());
        }

        if let Some(ids) = lookup("ADMIN_IDS") {
            let (parsed, rejected) = parse_admin_ids(&ids);
            warnings.extend(
                rejected
                    .into_iter()
                    .map(|id| format!("Ignoring invalid admin id: {}", id)),
            );
            if !parsed.is_empty() {
                self.admin_ids = parsed;
            }
        }

        if let Some(dir) = lookup("DATA_DIR").filter(|d| !d.is_empty()) {
            self.storage.data_dir = PathBuf::from(dir);
        }

        if let Some(format) = lookup("STORAGE_FORMAT") {
            self.storage.format = format.parse()?;
        }

        if let Some(mode) = lookup("TELEGRAM_MODE") {
            self.telegram.mode = mode.parse()?;
        }

        match (lookup("PROXY_BASE_URL"), lookup("PROXY_API_KEY")) {
            (Some(base), Some(key)) if !base.is_empty() && !key.is_empty() => {
                let template = self
                    .proxy
                    .as_ref()
                    .map(|p| p.url_template.clone())
                    .unwrap_or_else(|| DEFAULT_PROXY_TEMPLATE.to_string());
                self.proxy = Some(ProxyConfig {
                    base_url: base,
                    api_key: key,
                    url_template: template,
                });
            }
            (Some(_), None) | (None, Some(_)) => {
                warnings.push(
                    "PROXY_BASE_URL and PROXY_API_KEY must be set together, ignoring".to_string(),
                );
            }
            _ => {}
        }

        Ok(warnings)
    }

    /// Fail fast on settings the bot cannot run without
    pub fn validate(&self) -> Result<()> {
        if self.telegram.mode != TelegramMode::Disabled && self.telegram.bot_token.is_none() {
            return Err(BotError::MissingCredential("BOT_TOKEN"));
        }
        if self.telegram.mode == TelegramMode::Webhook && !self.http.enabled {
            return Err(BotError::Config(
                "webhook mode requires the HTTP server to be enabled".to_string(),
            ));
        }
        if self.list_limit == 0 {
            return Err(BotError::Config("list_limit must be positive".to_string()));
        }
        Ok(())
    }
}

/// Parse a comma-separated admin id list into valid ids and rejected entries
pub fn parse_admin_ids(value: &str) -> (Vec<i64>, Vec<String>) {
    let mut ids = Vec::new();
    let mut rejected = Vec::new();
    for entry in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match entry.parse::<i64>() {
            Ok(id) => ids.push(id),
            Err(_) => rejected.push(entry.to_string()),
        }
    }
    (ids, rejected)
}
