//! Bot API HTTP client

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use super::types::{ApiResponse, Update};
use crate::bot::Reply;
use crate::error::{BotError, Result};

/// Longest text message the Bot API accepts
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Telegram Bot API client
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    /// `<api>/bot<token>`; never logged
    base_url: String,
    poll_timeout_secs: u64,
}

impl TelegramClient {
    pub fn new(api_base_url: &str, token: &str, poll_timeout_secs: u64) -> Result<Self> {
        // Requests must outlive the long-poll window
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 15))
            .build()?;

        Ok(Self {
            http,
            base_url: format!("{}/bot{}", api_base_url.trim_end_matches('/'), token),
            poll_timeout_secs,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn parse<T: DeserializeOwned>(method: &str, response: reqwest::Response) -> Result<T> {
        let body: ApiResponse<T> = response.json().await?;
        match (body.ok, body.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(BotError::Telegram(format!(
                "{} failed: {}",
                method,
                body.description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, payload: serde_json::Value) -> Result<T> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(&payload)
            .send()
            .await?;
        Self::parse(method, response).await
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": self.poll_timeout_secs,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        for chunk in split_message(text, MAX_MESSAGE_CHARS) {
            let _: serde_json::Value = self
                .call("sendMessage", json!({ "chat_id": chat_id, "text": chunk }))
                .await?;
        }
        Ok(())
    }

    pub async fn send_document(
        &self,
        chat_id: i64,
        file_name: &str,
        content: Vec<u8>,
        caption: &str,
    ) -> Result<()> {
        let part = Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str("audio/x-mpegurl")?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("document", part);

        let response = self
            .http
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await?;
        let _: serde_json::Value = Self::parse("sendDocument", response).await?;
        Ok(())
    }

    /// Send a handler reply to a chat
    pub async fn deliver(&self, chat_id: i64, reply: Reply) -> Result<()> {
        match reply {
            Reply::Text(text) => self.send_message(chat_id, &text).await,
            Reply::Document {
                file_name,
                content,
                caption,
            } => {
                self.send_document(chat_id, &file_name, content, &caption)
                    .await
            }
        }
    }

    /// Register the webhook endpoint
    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> Result<()> {
        let mut payload = json!({ "url": url, "allowed_updates": ["message"] });
        if let Some(secret) = secret {
            payload["secret_token"] = json!(secret);
        }
        let _: bool = self.call("setWebhook", payload).await?;
        Ok(())
    }

    /// Remove any webhook so `getUpdates` works
    pub async fn delete_webhook(&self) -> Result<()> {
        let _: bool = self.call("deleteWebhook", json!({})).await?;
        Ok(())
    }
}

/// Split text into chunks of at most `max` characters, preferring line breaks
pub fn split_message(text: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        for ch in line.chars() {
            if current_len == max {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push(ch);
            current_len += 1;
        }
        // Start a fresh chunk at a line boundary when the next line may not fit
        if current_len > max / 2 && current.ends_with('\n') {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }
    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}
