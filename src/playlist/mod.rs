//! Playlist generation module
//!
//! This module handles M3U playlist generation:
//! - Channel filters (group, country, language, quality, category, tag)
//! - Extended M3U rendering with expiry header
//! - VOD proxy URL rewriting

pub mod filter;
pub mod generator;

pub use filter::ChannelFilter;
pub use generator::{generate_playlist, PlaylistDocument, PlaylistRequest};
