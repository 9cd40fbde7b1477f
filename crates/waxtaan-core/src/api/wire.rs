//! Wire shapes of API payloads and their conversion into model types.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use crate::models::{Group, Identity, MessageKind, RawMessage};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum WireError {
    #[error("bad timestamp {0:?}")]
    Timestamp(String),

    #[error("unknown message type {0:?}")]
    UnknownKind(String),
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMessage {
    #[serde(default)]
    id: Option<Identity>,
    sender: Identity,
    recipient: Identity,
    #[serde(default)]
    content: Option<String>,
    timestamp: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    file: Option<String>,
}

impl TryFrom<WireMessage> for RawMessage {
    type Error = WireError;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let kind = match wire.kind.as_deref() {
            None | Some("") | Some("text") => MessageKind::Text,
            Some("file") => MessageKind::File,
            Some(other) => return Err(WireError::UnknownKind(other.to_string())),
        };
        Ok(RawMessage {
            id: wire.id.map(|id| id.to_string()),
            sender: wire.sender,
            recipient: wire.recipient,
            content: wire.content.unwrap_or_default(),
            timestamp: parse_timestamp(&wire.timestamp)?,
            kind,
            file_ref: wire.file.filter(|f| !f.is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireGroup {
    id: Identity,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    members: Option<Vec<Identity>>,
}

impl From<WireGroup> for Group {
    fn from(wire: WireGroup) -> Self {
        Group::new(
            wire.id,
            wire.name.unwrap_or_default(),
            wire.members.unwrap_or_default(),
        )
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
}

/// RFC 3339, or a zone-less `YYYY-MM-DDTHH:MM:SS[.fff]` taken as UTC
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, WireError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| WireError::Timestamp(raw.to_string()))
}

/// Parse a JSON array record by record, skipping (and logging) records that
/// do not convert instead of failing the whole list.
pub(crate) fn parse_list<W, T>(values: Vec<serde_json::Value>, what: &str) -> Vec<T>
where
    W: DeserializeOwned,
    T: TryFrom<W>,
    T::Error: std::fmt::Display,
{
    values
        .into_iter()
        .filter_map(|value| {
            let wire = match serde_json::from_value::<W>(value) {
                Ok(wire) => wire,
                Err(e) => {
                    warn!("skipping malformed {}: {}", what, e);
                    return None;
                }
            };
            match T::try_from(wire) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!("skipping invalid {}: {}", what, e);
                    None
                }
            }
        })
        .collect()
}
