//! Configuration file support
//!
//! Loads bot configuration from TOML files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::catalog::StorageFormat;
use crate::config::{
    BotConfig, HttpConfig, ProxyConfig, StorageConfig, TelegramConfig, TelegramMode,
    DEFAULT_PROXY_TEMPLATE,
};

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Bot settings
    #[serde(default)]
    pub bot: BotSettings,
    /// Telegram settings
    pub telegram: Option<TelegramSettings>,
    /// Storage settings
    #[serde(default)]
    pub storage: StorageSettings,
    /// HTTP settings
    pub http: Option<HttpSettings>,
    /// Proxy settings
    pub proxy: Option<ProxySettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotSettings {
    /// Telegram user ids allowed to manage the catalog
    #[serde(default)]
    pub admin_ids: Vec<i64>,
    /// Maximum number of entries shown by list commands
    pub list_limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramSettings {
    /// Update delivery mode (polling, webhook, disabled)
    pub mode: Option<TelegramMode>,
    /// Long-poll timeout in seconds
    pub poll_timeout_secs: Option<u64>,
    /// Bot API base address
    pub api_base_url: Option<String>,
    /// Webhook secret token
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding the catalog files
    pub data_dir: PathBuf,
    /// File format (json, csv, jsonl)
    pub format: Option<StorageFormat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Run the HTTP server
    pub enabled: Option<bool>,
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Externally reachable base URL
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxySettings {
    /// Proxy base address
    pub base_url: String,
    /// Proxy credential
    pub api_key: String,
    /// URL template
    pub url_template: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        let defaults = StorageConfig::default();
        Self {
            data_dir: defaults.data_dir,
            format: None,
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        let defaults = HttpConfig::default();
        Self {
            enabled: None,
            host: defaults.host,
            port: defaults.port,
            public_url: None,
        }
    }
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        Self {
            bot: BotSettings {
                admin_ids: Vec::new(),
                list_limit: Some(20),
            },
            telegram: Some(TelegramSettings {
                mode: Some(TelegramMode::Polling),
                poll_timeout_secs: Some(30),
                api_base_url: Some("https://api.telegram.org".to_string()),
                webhook_secret: None,
            }),
            storage: StorageSettings {
                data_dir: PathBuf::from("data"),
                format: Some(StorageFormat::Json),
            },
            http: Some(HttpSettings {
                enabled: Some(false),
                host: "0.0.0.0".to_string(),
                port: 8080,
                public_url: None,
            }),
            proxy: None,
            logging: Some(LoggingSettings {
                level: "info".to_string(),
                format: Some("pretty".to_string()),
            }),
        }
    }

    /// Convert to BotConfig
    pub fn into_bot_config(self) -> BotConfig {
        let defaults = BotConfig::default();
        let telegram = match self.telegram {
            Some(t) => TelegramConfig {
                bot_token: None,
                mode: t.mode.unwrap_or(defaults.telegram.mode),
                poll_timeout_secs: t
                    .poll_timeout_secs
                    .unwrap_or(defaults.telegram.poll_timeout_secs),
                api_base_url: t
                    .api_base_url
                    .unwrap_or_else(|| defaults.telegram.api_base_url.clone()),
                webhook_secret: t.webhook_secret,
            },
            None => defaults.telegram.clone(),
        };
        let http = match self.http {
            Some(h) => HttpConfig {
                enabled: h.enabled.unwrap_or(true),
                host: h.host,
                port: h.port,
                public_url: h.public_url,
            },
            None => defaults.http.clone(),
        };
        let (log_level, log_format) = match self.logging {
            Some(l) => (
                l.level,
                l.format.unwrap_or_else(|| defaults.log_format.clone()),
            ),
            None => (defaults.log_level.clone(), defaults.log_format.clone()),
        };

        BotConfig {
            admin_ids: self.bot.admin_ids,
            list_limit: self.bot.list_limit.unwrap_or(defaults.list_limit),
            telegram,
            storage: StorageConfig {
                data_dir: self.storage.data_dir,
                format: self.storage.format.unwrap_or(defaults.storage.format),
            },
            http,
            proxy: self.proxy.map(|p| ProxyConfig {
                base_url: p.base_url,
                api_key: p.api_key,
                url_template: p
                    .url_template
                    .unwrap_or_else(|| DEFAULT_PROXY_TEMPLATE.to_string()),
            }),
            log_level,
            log_format,
        }
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigFile::default_config();
    config.to_file(path)?;
    Ok(())
}
