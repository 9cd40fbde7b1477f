use serde::Serialize;

use super::Identity;

/// A group as returned by `/api/groups`. `members` keeps server order with
/// duplicates removed; build through [`Group::new`] so that holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub id: Identity,
    pub name: String,
    pub members: Vec<Identity>,
}

impl Group {
    pub fn new(id: impl Into<Identity>, name: impl Into<String>, members: Vec<Identity>) -> Self {
        let mut group = Self {
            id: id.into(),
            name: name.into(),
            members: Vec::with_capacity(members.len()),
        };
        for member in members {
            if !group.members.contains(&member) {
                group.members.push(member);
            }
        }
        group
    }

    pub fn has_member(&self, id: &Identity) -> bool {
        self.members.iter().any(|m| m == id)
    }
}
