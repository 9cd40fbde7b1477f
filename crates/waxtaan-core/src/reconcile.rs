//! Conversation reconciliation.
//!
//! Turns one poll's worth of messages and groups into the ordered list of
//! conversations the UI shows, and advances the unread counters. The pass is
//! a pure function of its inputs: every piece of state it depends on
//! (current user, prior conversations, prior unread map, selection) is passed
//! in explicitly, and nothing is fetched from inside.
//!
//! Display names are looked up through an [`IdentityResolver`]. Lookups never
//! fail the pass; an identity that cannot be resolved is shown as its raw id.

use std::collections::{HashMap, HashSet};

use crate::models::{
    Conversation, ConversationKey, DisplayMessage, Group, Identity, MemberInfo, RawMessage,
    UserProfile,
};
use crate::store::{UnreadEntry, UnreadState};

/// Source of display names for user identities.
pub trait IdentityResolver {
    /// `None` when the identity is unknown or its lookup failed
    fn resolve(&self, id: &Identity) -> Option<UserProfile>;
}

impl IdentityResolver for HashMap<Identity, UserProfile> {
    fn resolve(&self, id: &Identity) -> Option<UserProfile> {
        self.get(id).cloned()
    }
}

/// Snapshot of everything one pass reads.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileInput<'a> {
    pub self_id: &'a Identity,
    /// All messages visible to the caller, in fetch order
    pub messages: &'a [RawMessage],
    pub groups: &'a [Group],
    /// Conversations from the previous pass plus local placeholders
    pub prior_conversations: &'a [Conversation],
    pub prior_unread: &'a UnreadState,
    pub selected: Option<&'a ConversationKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutput {
    pub conversations: Vec<Conversation>,
    pub unread: UnreadState,
}

/// How the messages of a pass split between group and private conversations.
struct Partition<'a> {
    my_groups: Vec<&'a Group>,
    /// Per group in `my_groups`, indices into the message slice
    group_messages: Vec<Vec<usize>>,
    /// Counterparts in order of first appearance, with their message indices
    private_messages: Vec<(&'a Identity, Vec<usize>)>,
}

fn split_messages<'a>(
    self_id: &Identity,
    messages: &'a [RawMessage],
    groups: &'a [Group],
) -> Partition<'a> {
    let my_groups: Vec<&Group> = groups.iter().filter(|g| g.has_member(self_id)).collect();
    let group_ids: HashSet<&Identity> = my_groups.iter().map(|g| &g.id).collect();

    let mut claimed = vec![false; messages.len()];
    let group_messages: Vec<Vec<usize>> = my_groups
        .iter()
        .map(|group| {
            messages
                .iter()
                .enumerate()
                // A sender that is itself one of our groups is an id collision, not a member
                .filter(|(_, m)| m.recipient == group.id && !group_ids.contains(&m.sender))
                .map(|(i, _)| {
                    claimed[i] = true;
                    i
                })
                .collect::<Vec<usize>>()
        })
        .collect();

    let mut private_messages: Vec<(&Identity, Vec<usize>)> = Vec::new();
    let mut slot_by_counterpart: HashMap<&Identity, usize> = HashMap::new();
    for (i, message) in messages.iter().enumerate() {
        if claimed[i] {
            continue;
        }
        let Some(counterpart) = message.counterpart(self_id) else {
            continue;
        };
        if group_ids.contains(counterpart) {
            continue;
        }
        let slot = *slot_by_counterpart.entry(counterpart).or_insert_with(|| {
            private_messages.push((counterpart, Vec::new()));
            private_messages.len() - 1
        });
        private_messages[slot].1.push(i);
    }

    Partition {
        my_groups,
        group_messages,
        private_messages,
    }
}

/// Distinct identities a pass over these inputs will ask the resolver about:
/// members of the caller's groups and private counterparts, first-seen order.
pub fn identities_to_resolve(
    self_id: &Identity,
    messages: &[RawMessage],
    groups: &[Group],
) -> Vec<Identity> {
    let partition = split_messages(self_id, messages, groups);
    let mut seen = HashSet::new();
    partition
        .my_groups
        .iter()
        .flat_map(|g| g.members.iter())
        .chain(partition.private_messages.iter().map(|(c, _)| *c))
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}

/// Run one reconciliation pass.
pub fn reconcile(input: &ReconcileInput<'_>, resolver: &impl IdentityResolver) -> ReconcileOutput {
    let self_id = input.self_id;
    let partition = split_messages(self_id, input.messages, input.groups);

    let group_conversations = partition
        .my_groups
        .iter()
        .zip(&partition.group_messages)
        .map(|(group, indices)| {
            let members = group
                .members
                .iter()
                .map(|id| MemberInfo {
                    id: id.clone(),
                    name: resolver
                        .resolve(id)
                        .map(|p| p.name)
                        .unwrap_or_else(|| id.to_string()),
                })
                .collect();
            Conversation::group(
                group.id.clone(),
                group.name.clone(),
                members,
                display_messages(input.messages, indices, self_id),
            )
        });

    // One lookup per counterpart, not per message
    let private_conversations = partition.private_messages.iter().map(|(counterpart, indices)| {
        let profile = resolver.resolve(counterpart).unwrap_or_else(|| UserProfile {
            name: counterpart.to_string(),
            avatar: None,
        });
        Conversation::private(
            (*counterpart).clone(),
            profile,
            display_messages(input.messages, indices, self_id),
        )
    });

    // Local placeholders only survive while the server knows nothing about them
    let local_placeholders = input
        .prior_conversations
        .iter()
        .filter(|c| c.messages.is_empty())
        .cloned();

    let mut seen = HashSet::new();
    let conversations: Vec<Conversation> = group_conversations
        .chain(private_conversations)
        .chain(local_placeholders)
        .filter(|c| seen.insert(c.key.clone()))
        .collect();

    let unread = update_unread(&conversations, input.prior_unread, input.selected);

    ReconcileOutput {
        conversations,
        unread,
    }
}

/// Next unread map. Keys absent from `conversations` are dropped.
pub fn update_unread(
    conversations: &[Conversation],
    prior: &UnreadState,
    selected: Option<&ConversationKey>,
) -> UnreadState {
    let mut unread = UnreadState::new();
    for conversation in conversations {
        let key = conversation.key.clone();
        if selected == Some(&key) {
            unread.mark_read(key, conversation.messages.len());
            continue;
        }
        let last_read = prior.last_read(&key);
        let first_unread = last_read.map_or(0, |i| i + 1);
        let count = conversation
            .messages
            .iter()
            .skip(first_unread)
            .filter(|m| !m.from_me)
            .count();
        unread.insert(key, UnreadEntry { count, last_read });
    }
    unread
}

fn display_messages(
    messages: &[RawMessage],
    indices: &[usize],
    self_id: &Identity,
) -> Vec<DisplayMessage> {
    let mut out: Vec<DisplayMessage> = indices
        .iter()
        .map(|&i| DisplayMessage::from_raw(&messages[i], self_id))
        .collect();
    // Stable: equal timestamps keep fetch order
    out.sort_by_key(|m| m.timestamp);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageKind;
    use chrono::{DateTime, Utc};

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn msg(sender: &str, recipient: &str, content: &str, at: &str) -> RawMessage {
        RawMessage {
            id: None,
            sender: sender.into(),
            recipient: recipient.into(),
            content: content.to_string(),
            timestamp: ts(at),
            kind: MessageKind::Text,
            file_ref: None,
        }
    }

    fn group(id: &str, name: &str, members: &[&str]) -> Group {
        Group::new(id, name, members.iter().map(|m| Identity::from(*m)).collect())
    }

    fn directory(entries: &[(&str, &str)]) -> HashMap<Identity, UserProfile> {
        entries
            .iter()
            .map(|(id, name)| {
                (
                    Identity::from(*id),
                    UserProfile {
                        name: name.to_string(),
                        avatar: None,
                    },
                )
            })
            .collect()
    }

    fn run(
        me: &Identity,
        messages: &[RawMessage],
        groups: &[Group],
        prior: &[Conversation],
        unread: &UnreadState,
        selected: Option<&ConversationKey>,
    ) -> ReconcileOutput {
        let resolver = directory(&[("u2", "Moussa Fall"), ("u3", "Awa")]);
        reconcile(
            &ReconcileInput {
                self_id: me,
                messages,
                groups,
                prior_conversations: prior,
                prior_unread: unread,
                selected,
            },
            &resolver,
        )
    }

    #[test]
    fn test_outgoing_private_message_has_no_unread() {
        let me = Identity::from("u1");
        let messages = vec![msg("u1", "u2", "hi", "2024-01-01T10:00:00Z")];
        let out = run(&me, &messages, &[], &[], &UnreadState::new(), None);

        assert_eq!(out.conversations.len(), 1);
        let conv = &out.conversations[0];
        assert_eq!(conv.key, ConversationKey::user("u2"));
        assert_eq!(conv.display_name, "Moussa Fall");
        assert_eq!(conv.initials, "MF");
        assert_eq!(conv.messages.len(), 1);
        assert_eq!(conv.messages[0].text, "hi");
        assert!(conv.messages[0].from_me);
        assert_eq!(out.unread.count(&ConversationKey::user("u2")), 0);
    }

    #[test]
    fn test_incoming_private_message_is_unread() {
        let me = Identity::from("u1");
        let messages = vec![msg("u2", "u1", "salut", "2024-01-01T10:00:00Z")];
        let other = ConversationKey::user("u3");
        let out = run(&me, &messages, &[], &[], &UnreadState::new(), Some(&other));
        assert_eq!(out.unread.count(&ConversationKey::user("u2")), 1);
    }

    #[test]
    fn test_group_message_only_in_group_conversation() {
        let me = Identity::from("u1");
        let groups = vec![group("g1", "Famille", &["u1", "u2"])];
        let messages = vec![msg("u2", "g1", "yow", "2024-01-01T10:00:00Z")];
        let out = run(&me, &messages, &groups, &[], &UnreadState::new(), None);

        assert_eq!(out.conversations.len(), 1);
        assert_eq!(out.conversations[0].key, ConversationKey::group("g1"));
        assert_eq!(out.conversations[0].messages.len(), 1);
        assert!(out
            .conversations
            .iter()
            .all(|c| c.key != ConversationKey::user("u2")));
    }

    #[test]
    fn test_groups_without_me_are_ignored() {
        let me = Identity::from("u1");
        let groups = vec![group("g9", "Autres", &["u2", "u3"])];
        let messages = vec![msg("u2", "g9", "pas pour toi", "2024-01-01T10:00:00Z")];
        let out = run(&me, &messages, &groups, &[], &UnreadState::new(), None);
        assert!(out.conversations.is_empty());
    }

    #[test]
    fn test_sender_colliding_with_group_id_is_not_claimed() {
        let me = Identity::from("u1");
        let groups = vec![
            group("g1", "Un", &["u1"]),
            group("g2", "Deux", &["u1"]),
        ];
        let messages = vec![msg("g2", "g1", "weird", "2024-01-01T10:00:00Z")];
        let out = run(&me, &messages, &groups, &[], &UnreadState::new(), None);
        assert!(out.conversations.iter().all(|c| c.messages.is_empty()));
    }

    #[test]
    fn test_private_counterpart_matching_group_id_is_excluded() {
        let me = Identity::from("u1");
        let groups = vec![group("7", "Sept", &["u1"])];
        // recipient "7" is claimed by the group, sender "7" must not open a private chat
        let messages = vec![
            msg("u1", "7", "au groupe", "2024-01-01T10:00:00Z"),
            msg("7", "u1", "ambigu", "2024-01-01T10:01:00Z"),
        ];
        let out = run(&me, &messages, &groups, &[], &UnreadState::new(), None);
        assert_eq!(out.conversations.len(), 1);
        assert_eq!(out.conversations[0].key, ConversationKey::group("7"));
        assert_eq!(out.conversations[0].messages.len(), 1);
    }

    #[test]
    fn test_messages_sorted_with_stable_ties() {
        let me = Identity::from("u1");
        let messages = vec![
            msg("u2", "u1", "third", "2024-01-01T10:05:00Z"),
            msg("u2", "u1", "first-a", "2024-01-01T10:00:00Z"),
            msg("u1", "u2", "first-b", "2024-01-01T10:00:00Z"),
            msg("u2", "u1", "second", "2024-01-01T11:00:00+01:00"),
        ];
        let out = run(&me, &messages, &[], &[], &UnreadState::new(), None);
        let texts: Vec<&str> = out.conversations[0]
            .messages
            .iter()
            .map(|m| m.text.as_str())
            .collect();
        // 11:00+01:00 is 10:00Z, ties keep fetch order
        assert_eq!(texts, vec!["first-a", "first-b", "second", "third"]);
    }

    #[test]
    fn test_unresolved_identities_fall_back_to_raw_id() {
        let me = Identity::from("u1");
        let groups = vec![group("g1", "Bande", &["u1", "u404"])];
        let messages = vec![msg("u500", "u1", "hello", "2024-01-01T10:00:00Z")];
        let out = run(&me, &messages, &groups, &[], &UnreadState::new(), None);

        let group_conv = &out.conversations[0];
        let members = group_conv.members.as_ref().unwrap();
        assert_eq!(members[0].name, "u1");
        assert_eq!(members[1].name, "u404");

        let private = &out.conversations[1];
        assert_eq!(private.key, ConversationKey::user("u500"));
        assert_eq!(private.display_name, "u500");
    }

    #[test]
    fn test_order_groups_then_private_then_placeholders() {
        let me = Identity::from("u1");
        let groups = vec![group("g1", "Famille", &["u1", "u2"])];
        let messages = vec![
            msg("u3", "u1", "a", "2024-01-01T10:00:00Z"),
            msg("u1", "u2", "b", "2024-01-01T10:01:00Z"),
        ];
        let placeholder = Conversation::group("-1".into(), "Nouveau", vec![], vec![]);
        let out = run(&me, &messages, &groups, &[placeholder], &UnreadState::new(), None);

        let keys: Vec<String> = out.conversations.iter().map(|c| c.key.to_string()).collect();
        assert_eq!(keys, vec!["group:g1", "user:u3", "user:u2", "group:-1"]);
    }

    #[test]
    fn test_placeholder_superseded_by_server_data() {
        let me = Identity::from("u1");
        let placeholder = Conversation::private(
            "u2".into(),
            UserProfile {
                name: "local name".to_string(),
                avatar: None,
            },
            vec![],
        );
        let messages = vec![msg("u2", "u1", "premier", "2024-01-01T10:00:00Z")];
        let out = run(&me, &messages, &[], &[placeholder], &UnreadState::new(), None);

        let matching: Vec<&Conversation> = out
            .conversations
            .iter()
            .filter(|c| c.key == ConversationKey::user("u2"))
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].messages.len(), 1);
        assert_eq!(matching[0].display_name, "Moussa Fall");
    }

    #[test]
    fn test_prior_conversations_with_messages_are_not_kept() {
        let me = Identity::from("u1");
        let first = run(
            &me,
            &[msg("u2", "u1", "x", "2024-01-01T10:00:00Z")],
            &[],
            &[],
            &UnreadState::new(),
            None,
        );
        // Server no longer returns anything for u2
        let second = run(&me, &[], &[], &first.conversations, &first.unread, None);
        assert!(second.conversations.is_empty());
        assert!(second.unread.is_empty());
    }

    #[test]
    fn test_no_duplicate_keys() {
        let me = Identity::from("u1");
        let groups = vec![
            group("g1", "Famille", &["u1"]),
            group("g1", "Famille bis", &["u1"]),
        ];
        let messages = vec![msg("u1", "u2", "x", "2024-01-01T10:00:00Z")];
        let prior = vec![
            Conversation::group("g1".into(), "local", vec![], vec![]),
            Conversation::group("-1".into(), "local", vec![], vec![]),
            Conversation::group("-1".into(), "local again", vec![], vec![]),
        ];
        let out = run(&me, &messages, &groups, &prior, &UnreadState::new(), None);

        let mut keys: Vec<&ConversationKey> = out.conversations.iter().map(|c| &c.key).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total);
        assert_eq!(out.conversations[0].display_name, "Famille");
    }

    #[test]
    fn test_idempotent() {
        let me = Identity::from("u1");
        let groups = vec![group("g1", "Famille", &["u1", "u2"])];
        let messages = vec![
            msg("u2", "g1", "a", "2024-01-01T10:00:00Z"),
            msg("u3", "u1", "b", "2024-01-01T10:01:00Z"),
        ];
        let first = run(&me, &messages, &groups, &[], &UnreadState::new(), None);
        let second = run(&me, &messages, &groups, &first.conversations, &first.unread, None);
        assert_eq!(first, second);
    }

    #[test]
    fn test_selected_conversation_is_fully_read() {
        let me = Identity::from("u1");
        let key = ConversationKey::user("u2");
        let messages = vec![
            msg("u2", "u1", "a", "2024-01-01T10:00:00Z"),
            msg("u2", "u1", "b", "2024-01-01T10:01:00Z"),
        ];
        let out = run(&me, &messages, &[], &[], &UnreadState::new(), Some(&key));
        let entry = out.unread.get(&key).unwrap();
        assert_eq!(entry.count, 0);
        assert_eq!(entry.last_read, Some(1));
    }

    #[test]
    fn test_unread_counts_only_after_last_read_and_not_mine() {
        let me = Identity::from("u1");
        let key = ConversationKey::user("u2");
        let mut prior = UnreadState::new();
        prior.insert(key.clone(), UnreadEntry { count: 0, last_read: Some(0) });
        let messages = vec![
            msg("u2", "u1", "read", "2024-01-01T10:00:00Z"),
            msg("u1", "u2", "mine", "2024-01-01T10:01:00Z"),
            msg("u2", "u1", "new 1", "2024-01-01T10:02:00Z"),
            msg("u2", "u1", "new 2", "2024-01-01T10:03:00Z"),
        ];
        let out = run(&me, &messages, &[], &[], &prior, None);
        let entry = out.unread.get(&key).unwrap();
        assert_eq!(entry.count, 2);
        assert_eq!(entry.last_read, Some(0));
    }

    #[test]
    fn test_last_read_monotonic_as_history_grows() {
        let me = Identity::from("u1");
        let key = ConversationKey::user("u2");
        let mut history = Vec::new();
        let mut unread = UnreadState::new();
        let mut conversations = Vec::new();
        let mut previous = -1;

        for minute in 0..5 {
            history.push(msg("u2", "u1", "ping", &format!("2024-01-01T10:0{}:00Z", minute)));
            // Reading u2 once in the middle advances the index
            let selected = (minute == 2).then_some(&key);
            let out = run(&me, &history, &[], &conversations, &unread, selected);
            let index = out.unread.get(&key).unwrap().last_read_index();
            assert!(index >= previous);
            previous = index;
            conversations = out.conversations;
            unread = out.unread;
        }
        assert_eq!(previous, 2);
        assert_eq!(unread.count(&key), 2);
    }

    #[test]
    fn test_identities_to_resolve_distinct_members_and_counterparts() {
        let me = Identity::from("u1");
        let groups = vec![
            group("g1", "Famille", &["u1", "u2"]),
            group("g2", "Travail", &["u2", "u3", "u1"]),
            group("g3", "Pas moi", &["u8"]),
        ];
        let messages = vec![
            msg("u4", "u1", "a", "2024-01-01T10:00:00Z"),
            msg("u1", "u2", "b", "2024-01-01T10:01:00Z"),
            msg("u4", "u1", "c", "2024-01-01T10:02:00Z"),
            msg("u5", "u6", "d", "2024-01-01T10:03:00Z"),
        ];
        let ids = identities_to_resolve(&me, &messages, &groups);
        let ids: Vec<&str> = ids.iter().map(|i| i.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2", "u3", "u4"]);
    }
}
