use std::cmp::Reverse;

use tracing::debug;

use crate::models::{
    Conversation, ConversationKey, ConversationKind, Group, Identity, MemberInfo, RawMessage,
    User, UserProfile,
};
use crate::reconcile::{reconcile, IdentityResolver, ReconcileInput, ReconcileOutput};
use crate::store::{UnreadEntry, UnreadState};

/// Client-side view model: the conversation list, unread counters and the
/// current selection.
///
/// Reconciliation results replace `conversations` and `unread` wholesale;
/// nothing edits a conversation in place.
#[derive(Debug, Default)]
pub struct ChatStore {
    current_user: Option<User>,
    conversations: Vec<Conversation>,
    unread: UnreadState,
    selected: Option<ConversationKey>,
    /// Highest pass number applied so far; older results are dropped
    last_applied_pass: u64,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything (logout)
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // ===== Getters =====

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Conversations with the most recent last message first; empty ones
    /// last. Ties keep reconciliation order.
    pub fn conversations_by_recent(&self) -> Vec<&Conversation> {
        let mut sorted: Vec<&Conversation> = self.conversations.iter().collect();
        sorted.sort_by_key(|c| Reverse(c.last_message().map(|m| m.timestamp)));
        sorted
    }

    pub fn conversation(&self, key: &ConversationKey) -> Option<&Conversation> {
        self.conversations.iter().find(|c| &c.key == key)
    }

    pub fn unread(&self) -> &UnreadState {
        &self.unread
    }

    pub fn unread_count(&self, key: &ConversationKey) -> usize {
        self.unread.count(key)
    }

    pub fn total_unread(&self) -> usize {
        self.unread.total()
    }

    pub fn selected(&self) -> Option<&ConversationKey> {
        self.selected.as_ref()
    }

    pub fn selected_conversation(&self) -> Option<&Conversation> {
        self.selected.as_ref().and_then(|k| self.conversation(k))
    }

    pub fn last_applied_pass(&self) -> u64 {
        self.last_applied_pass
    }

    // ===== Reconciliation =====

    pub fn set_current_user(&mut self, user: User) {
        self.current_user = Some(user);
    }

    /// Reconcile fetched data against the current state and apply the result.
    ///
    /// The snapshot (prior conversations, unread map, selection) is taken
    /// here, so a selection made while the fetch was in flight is honored.
    /// Returns false when `pass` is older than one already applied.
    pub fn reconcile_pass(
        &mut self,
        pass: u64,
        me: User,
        messages: &[RawMessage],
        groups: &[Group],
        resolver: &impl IdentityResolver,
    ) -> bool {
        if self.is_stale(pass) {
            return false;
        }
        let output = reconcile(
            &ReconcileInput {
                self_id: &me.id,
                messages,
                groups,
                prior_conversations: &self.conversations,
                prior_unread: &self.unread,
                selected: self.selected.as_ref(),
            },
            resolver,
        );
        self.current_user = Some(me);
        self.apply_pass(pass, output)
    }

    /// Replace conversations and unread counters with a pass result
    pub fn apply_pass(&mut self, pass: u64, output: ReconcileOutput) -> bool {
        if self.is_stale(pass) {
            return false;
        }
        self.last_applied_pass = pass;
        self.conversations = output.conversations;
        self.unread = output.unread;
        true
    }

    fn is_stale(&self, pass: u64) -> bool {
        if pass <= self.last_applied_pass {
            debug!(
                pass,
                latest = self.last_applied_pass,
                "discarding result of superseded pass"
            );
            return true;
        }
        false
    }

    // ===== Mutations =====

    /// Select a conversation and mark everything in it as read
    pub fn select_conversation(&mut self, key: ConversationKey) {
        match self.conversation(&key).map(|c| c.messages.len()) {
            Some(len) => self.unread.mark_read(key.clone(), len),
            None => {
                let last_read = self.unread.last_read(&key);
                self.unread
                    .insert(key.clone(), UnreadEntry { count: 0, last_read });
            }
        }
        self.selected = Some(key);
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Insert a conversation unless one with the same key exists.
    /// Returns whether it was inserted.
    pub fn add_local_conversation(&mut self, conversation: Conversation) -> bool {
        if self.conversation(&conversation.key).is_some() {
            return false;
        }
        self.conversations.push(conversation);
        true
    }

    /// Open (creating an empty placeholder if needed) and select the private
    /// conversation with `user`
    pub fn open_conversation_with(&mut self, user: Identity, profile: UserProfile) -> ConversationKey {
        let conversation = Conversation::private(user, profile, Vec::new());
        let key = conversation.key.clone();
        self.add_local_conversation(conversation);
        self.select_conversation(key.clone());
        key
    }

    /// Next synthetic id for a group the server has not confirmed yet:
    /// one below the lowest pending id, or -1.
    pub fn next_local_group_id(&self) -> Identity {
        let lowest = self
            .conversations
            .iter()
            .filter(|c| c.key.kind == ConversationKind::Group)
            .filter_map(|c| c.key.id.local_index())
            .min();
        Identity::from(lowest.map_or(-1, |n| n - 1))
    }

    /// Show a just-created group before the server reports it.
    ///
    /// Uses `server_id` when the create call returned one, otherwise a
    /// synthetic negative id. The creator is added to the member list. If a
    /// group with that id is already listed it is only selected.
    pub fn create_group_locally(
        &mut self,
        name: &str,
        mut members: Vec<MemberInfo>,
        server_id: Option<Identity>,
    ) -> ConversationKey {
        if let Some(me) = &self.current_user {
            if !members.iter().any(|m| m.id == me.id) {
                members.push(MemberInfo {
                    id: me.id.clone(),
                    name: me.display_name().to_string(),
                });
            }
        }

        let id = server_id.unwrap_or_else(|| self.next_local_group_id());
        let key = ConversationKey::group(id.clone());
        if self.conversation(&key).is_none() {
            let conversation = Conversation::group(id, name, members, Vec::new());
            self.conversations.insert(0, conversation);
        }
        self.select_conversation(key.clone());
        key
    }
}
