//! Axum router configuration

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::handlers::{health_check, playlist, version_check, webhook};

/// Create the Axum router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health and version endpoints
        .route("/health", get(health_check))
        .route("/version", get(version_check))
        // Telegram delivery
        .route("/webhook", post(webhook))
        // Customer downloads
        .route("/playlist/{token}", get(playlist))
        // Middleware
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
