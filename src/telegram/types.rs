//! Bot API payload types
//!
//! Only the fields the bot reads are modelled; everything else is ignored.

use serde::{Deserialize, Serialize};

use crate::bot::{Content, Incoming, Upload};

/// Envelope of every Bot API response
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub video: Option<FileRef>,
    pub document: Option<FileRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
}

/// Video or document attachment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRef {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

impl From<&FileRef> for Upload {
    fn from(file: &FileRef) -> Self {
        Upload {
            file_id: file.file_id.clone(),
            file_name: file.file_name.clone(),
            mime_type: file.mime_type.clone(),
        }
    }
}

impl Message {
    /// Strip transport details
    pub fn to_incoming(&self) -> Incoming {
        let content = if let Some(video) = &self.video {
            Content::Video(video.into())
        } else if let Some(document) = &self.document {
            Content::Document(document.into())
        } else if let Some(text) = &self.text {
            Content::Text(text.clone())
        } else {
            Content::Other
        };

        Incoming {
            chat_id: self.chat.id,
            user_id: self.from.as_ref().map(|u| u.id),
            content,
            caption: self.caption.clone(),
        }
    }
}
