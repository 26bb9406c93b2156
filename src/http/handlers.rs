//! HTTP request handlers

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDateTime;
use std::sync::Arc;

use crate::error::CatalogError;
use crate::playlist::{generate_playlist, ChannelFilter, PlaylistDocument, PlaylistRequest};
use crate::state::AppState;
use crate::telegram::{process_update, Update};

/// Header Telegram uses to echo the webhook secret
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// HTTP error type
#[derive(Debug)]
pub enum HttpError {
    NotFound(String),
    Forbidden(String),
    Unauthorized,
    Unavailable(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            HttpError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            HttpError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            HttpError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            HttpError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            HttpError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, body).into_response()
    }
}

impl From<CatalogError> for HttpError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound { .. } => HttpError::NotFound("Unknown token".to_string()),
            _ => {
                tracing::error!("Catalog failure: {}", err);
                HttpError::InternalError("Catalog unavailable".to_string())
            }
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("iptv-bot v", env!("CARGO_PKG_VERSION"))
}

/// Telegram webhook endpoint
/// POST /webhook
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> Result<StatusCode, HttpError> {
    if let Some(secret) = &state.config.telegram.webhook_secret {
        let given = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if given != Some(secret.as_str()) {
            tracing::warn!("Webhook call with missing or wrong secret");
            return Err(HttpError::Unauthorized);
        }
    }

    let client = state
        .telegram
        .clone()
        .ok_or_else(|| HttpError::Unavailable("Telegram is disabled".to_string()))?;

    // Acknowledge right away; Telegram retries slow deliveries
    tokio::spawn(async move {
        process_update(state, &client, update).await;
    });

    Ok(StatusCode::OK)
}

/// Render the playlist of a customer token and count the download
pub fn customer_playlist(
    state: &AppState,
    token: &str,
    now: NaiveDateTime,
) -> Result<PlaylistDocument, HttpError> {
    let mut rendered = None;

    // Validity check, rendering and the usage count happen under one lock
    let customer = state.catalog.customers.try_update(token, |customer| {
        if !customer.active {
            return Err(HttpError::Forbidden("Token is inactive".to_string()));
        }
        if customer.is_expired(now) {
            return Err(HttpError::Forbidden(format!(
                "Token expired on {}",
                customer.expires.format("%Y-%m-%d")
            )));
        }

        let filter = ChannelFilter::from_map(&customer.filters).map_err(|e| {
            tracing::error!("Customer {} has invalid filters: {}", customer.username, e);
            HttpError::InternalError("Invalid stored filter".to_string())
        })?;
        let channels = state.catalog.channels.load()?;
        let vod_items = state.catalog.vod.load()?;

        let request = PlaylistRequest {
            username: customer.username.clone(),
            validity_days: customer.remaining_days(now),
            generated_at: now,
            filter,
        };
        rendered = Some(generate_playlist(
            &request,
            &channels,
            &vod_items,
            state.config.proxy.as_ref(),
        ));
        customer.usage_count += 1;
        Ok(())
    })?;

    let doc = rendered
        .ok_or_else(|| HttpError::InternalError("Playlist was not rendered".to_string()))?;
    tracing::info!(
        "Served playlist to {} ({} channels, {} VOD)",
        customer.username,
        doc.channel_count,
        doc.vod_count
    );

    Ok(doc)
}

/// Customer playlist endpoint
/// GET /playlist/{token}
pub async fn playlist(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Response, HttpError> {
    let token = token.trim_end_matches(".m3u").to_string();

    // Catalog access is blocking file I/O
    let doc = tokio::task::spawn_blocking(move || customer_playlist(&state, &token, AppState::now()))
        .await
        .map_err(|e| HttpError::InternalError(e.to_string()))??;

    let mut headers = HeaderMap::new();
    headers.insert("Content-Type", HeaderValue::from_static("audio/x-mpegurl"));
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    let disposition = format!("attachment; filename=\"{}\"", doc.file_name);
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert("Content-Disposition", value);
    }

    Ok((headers, doc.body).into_response())
}
