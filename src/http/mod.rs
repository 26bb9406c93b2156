//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Health and version endpoints
//! - Telegram webhook delivery
//! - Token-protected customer playlist downloads

pub mod handlers;
pub mod routes;

pub use routes::create_router;
