use std::fmt;
use std::str::FromStr;

use super::{DisplayMessage, Identity, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConversationKind {
    User,
    Group,
}

impl ConversationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationKind::User => "user",
            ConversationKind::Group => "group",
        }
    }
}

/// Tagged identity of a conversation.
///
/// User ids and group ids live in separate spaces that may collide, so a
/// bare id is not enough to tell two conversations apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationKey {
    pub kind: ConversationKind,
    pub id: Identity,
}

impl ConversationKey {
    pub fn user(id: impl Into<Identity>) -> Self {
        Self {
            kind: ConversationKind::User,
            id: id.into(),
        }
    }

    pub fn group(id: impl Into<Identity>) -> Self {
        Self {
            kind: ConversationKind::Group,
            id: id.into(),
        }
    }
}

/// Rendered as `user:<id>` or `group:<id>`
impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid conversation key {0:?}, expected user:<id> or group:<id>")]
pub struct ParseKeyError(pub String);

impl FromStr for ConversationKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| ParseKeyError(s.to_string()))?;
        if id.is_empty() {
            return Err(ParseKeyError(s.to_string()));
        }
        match kind {
            "user" => Ok(Self::user(id)),
            "group" => Ok(Self::group(id)),
            _ => Err(ParseKeyError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub id: Identity,
    pub name: String,
}

/// View model of one conversation. `messages` is ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub key: ConversationKey,
    pub display_name: String,
    pub initials: String,
    pub avatar: Option<String>,
    pub messages: Vec<DisplayMessage>,
    /// Resolved member names, group conversations only
    pub members: Option<Vec<MemberInfo>>,
}

impl Conversation {
    pub fn private(counterpart: Identity, profile: UserProfile, messages: Vec<DisplayMessage>) -> Self {
        Self {
            key: ConversationKey::user(counterpart),
            initials: initials(&profile.name),
            display_name: profile.name,
            avatar: profile.avatar,
            messages,
            members: None,
        }
    }

    pub fn group(
        id: Identity,
        name: impl Into<String>,
        members: Vec<MemberInfo>,
        messages: Vec<DisplayMessage>,
    ) -> Self {
        let name = name.into();
        Self {
            key: ConversationKey::group(id),
            initials: initials(&name),
            display_name: name,
            avatar: None,
            messages,
            members: Some(members),
        }
    }

    pub fn is_group(&self) -> bool {
        self.key.kind == ConversationKind::Group
    }

    pub fn last_message(&self) -> Option<&DisplayMessage> {
        self.messages.last()
    }
}

/// First letter of each word, uppercased: "awa ndiaye" -> "AN"
pub fn initials(name: &str) -> String {
    name.split(' ')
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}
