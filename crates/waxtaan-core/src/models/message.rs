use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use super::Identity;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    File,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::File => "file",
        }
    }
}

/// A message as fetched from `GET /api/messages`, validated at the API boundary.
///
/// `recipient` is either a user or a group identity; nothing in the payload
/// says which.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub id: Option<String>,
    pub sender: Identity,
    pub recipient: Identity,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
    pub file_ref: Option<String>,
}

impl RawMessage {
    /// The other party of a one-to-one message involving `self_id`, if any
    pub fn counterpart(&self, self_id: &Identity) -> Option<&Identity> {
        if &self.sender == self_id {
            Some(&self.recipient)
        } else if &self.recipient == self_id {
            Some(&self.sender)
        } else {
            None
        }
    }
}

/// A message as shown inside a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    pub id: Option<String>,
    pub sender: Identity,
    pub text: String,
    pub from_me: bool,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
    pub file: Option<String>,
}

impl DisplayMessage {
    pub fn from_raw(raw: &RawMessage, self_id: &Identity) -> Self {
        Self {
            id: raw.id.clone(),
            sender: raw.sender.clone(),
            text: raw.content.clone(),
            from_me: &raw.sender == self_id,
            timestamp: raw.timestamp,
            kind: raw.kind,
            file: raw.file_ref.clone(),
        }
    }

    /// Local wall-clock time, `HH:MM`
    pub fn time_label(&self) -> String {
        self.timestamp.with_timezone(&Local).format("%H:%M").to_string()
    }
}

/// A file sent as a multipart part (message attachment or avatar)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self { file_name, bytes })
    }
}

/// Body of the `message` part sent to `POST /api/messages`.
/// The server fills in the file URL, so `file` is always null on the way out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub sender: Identity,
    pub recipient: Identity,
    pub content: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub file: Option<String>,
}

impl OutgoingMessage {
    pub fn new(
        sender: Identity,
        recipient: Identity,
        content: impl Into<String>,
        has_attachment: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            sender,
            recipient,
            content: content.into(),
            timestamp: now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            kind: if has_attachment {
                MessageKind::File
            } else {
                MessageKind::Text
            },
            file: None,
        }
    }
}
