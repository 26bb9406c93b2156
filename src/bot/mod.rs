//! Bot command layer
//!
//! Transport-neutral message handling:
//! - Command parsing
//! - Admin allow-list check
//! - Catalog mutations and playlist generation
//! - Text or document replies

pub mod command;
pub mod handlers;

pub use command::Command;
pub use handlers::handle_incoming;

/// An uploaded file attached to a message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Upload {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

impl Upload {
    pub fn is_video(&self) -> bool {
        self.mime_type
            .as_deref()
            .map(|m| m.starts_with("video/"))
            .unwrap_or(false)
    }
}

/// Message payload
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Video(Upload),
    Document(Upload),
    Other,
}

/// An inbound message, already stripped of transport details
#[derive(Debug, Clone, PartialEq)]
pub struct Incoming {
    pub chat_id: i64,
    /// Sender identity, absent for channel posts
    pub user_id: Option<i64>,
    pub content: Content,
    pub caption: Option<String>,
}

/// What to send back
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Document {
        file_name: String,
        content: Vec<u8>,
        caption: String,
    },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }
}
