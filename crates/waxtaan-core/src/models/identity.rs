use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque identifier for a user or a group.
///
/// The API is not consistent about id encoding: the same id can come back as
/// a JSON string in one payload and as a number in another. Both are
/// normalized to their string form so that `"3"` and `3` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Synthetic index of a locally created group (`-1`, `-2`, ...), if this is one
    pub fn local_index(&self) -> Option<i64> {
        self.0.parse::<i64>().ok().filter(|n| *n < 0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for Identity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<i64> for Identity {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum WireId {
            Str(String),
            Int(i64),
            Uint(u64),
        }

        Ok(match WireId::deserialize(deserializer)? {
            WireId::Str(s) => Identity(s),
            WireId::Int(n) => Identity(n.to_string()),
            WireId::Uint(n) => Identity(n.to_string()),
        })
    }
}
