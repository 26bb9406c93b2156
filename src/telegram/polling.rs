//! Long-polling update loop

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::{process_update, TelegramClient};
use crate::state::AppState;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Poll for updates and handle them in order until `shutdown` resolves
pub async fn run_polling<F>(state: Arc<AppState>, client: TelegramClient, shutdown: F)
where
    F: Future<Output = ()>,
{
    if let Err(e) = client.delete_webhook().await {
        tracing::warn!("Could not clear webhook before polling: {}", e);
    }
    tracing::info!("Polling for updates");

    tokio::pin!(shutdown);
    let mut offset: Option<i64> = None;
    let mut backoff = Duration::from_secs(1);

    loop {
        let updates = tokio::select! {
            _ = &mut shutdown => break,
            result = client.get_updates(offset) => result,
        };

        match updates {
            Ok(updates) => {
                backoff = Duration::from_secs(1);
                for update in updates {
                    offset = Some(update.update_id + 1);
                    process_update(state.clone(), &client, update).await;
                }
            }
            Err(e) => {
                tracing::error!("getUpdates failed: {}, retrying in {:?}", e, backoff);
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = next_backoff(backoff);
            }
        }
    }

    tracing::info!("Polling stopped");
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}
