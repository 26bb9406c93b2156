//! Integration testing module
//!
//! End-to-end tests for the bot:
//! - Command flows against a scratch data directory
//! - Playlist structure validation
//! - Storage format interoperability

pub mod e2e;
pub mod fixtures;
pub mod validation;
