use serde::{Deserialize, Serialize};

use super::{Attachment, Identity};

/// A user record as returned by `/api/users/*`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Identity,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub contacts: Vec<Identity>,
    #[serde(default)]
    pub groups: Vec<Identity>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            name: self.display_name().to_string(),
            avatar: self.avatar.clone().filter(|a| !a.is_empty()),
        }
    }

    /// Name to show for this user, the raw id when the server sent no name
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}

/// The part of a user the reconciler needs to label a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub name: String,
    pub avatar: Option<String>,
}

/// Fields sent to `PUT /api/users/me`
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: String,
    pub status: String,
    pub password: Option<String>,
    pub avatar: Option<Attachment>,
}
