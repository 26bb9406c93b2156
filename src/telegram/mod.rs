//! Telegram Bot API transport
//!
//! Receives updates by long polling or webhook and delivers replies:
//! - Bot API payload types
//! - `reqwest` client for getUpdates, sendMessage and sendDocument
//! - Polling loop

pub mod client;
pub mod polling;
pub mod types;

pub use client::TelegramClient;
pub use polling::run_polling;
pub use types::Update;

use std::sync::Arc;

use crate::bot::{handle_incoming, Reply};
use crate::state::AppState;

/// Run the command handlers for one update. Catalog I/O is blocking, so it
/// runs on the blocking thread pool.
pub async fn dispatch_update(state: Arc<AppState>, update: Update) -> Option<(i64, Reply)> {
    let message = update.message?;
    let incoming = message.to_incoming();
    let chat_id = incoming.chat_id;

    let result = tokio::task::spawn_blocking(move || {
        handle_incoming(&state, &incoming, AppState::now())
    })
    .await;

    match result {
        Ok(reply) => reply.map(|r| (chat_id, r)),
        Err(e) => {
            tracing::error!("Handler task for update {} failed: {}", update.update_id, e);
            None
        }
    }
}

/// Dispatch an update and send the reply, logging delivery failures
pub async fn process_update(state: Arc<AppState>, client: &TelegramClient, update: Update) {
    let update_id = update.update_id;
    if let Some((chat_id, reply)) = dispatch_update(state, update).await {
        if let Err(e) = client.deliver(chat_id, reply).await {
            tracing::error!("Failed to deliver reply for update {}: {}", update_id, e);
        }
    }
}
