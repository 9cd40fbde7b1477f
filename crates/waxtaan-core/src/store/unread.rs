use std::collections::HashMap;

use crate::models::ConversationKey;

/// Read position of one conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnreadEntry {
    pub count: usize,
    /// Index of the last message seen; `None` when nothing has been read
    pub last_read: Option<usize>,
}

impl UnreadEntry {
    /// `last_read` as a signed index, -1 meaning nothing read
    pub fn last_read_index(&self) -> i64 {
        self.last_read.map(|i| i as i64).unwrap_or(-1)
    }
}

/// Unread counts keyed by conversation. Survives across reconciliation
/// passes; each pass produces the next value from the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnreadState {
    entries: HashMap<ConversationKey, UnreadEntry>,
}

impl UnreadState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ConversationKey) -> Option<&UnreadEntry> {
        self.entries.get(key)
    }

    /// Unread count, zero for unknown keys
    pub fn count(&self, key: &ConversationKey) -> usize {
        self.entries.get(key).map(|e| e.count).unwrap_or(0)
    }

    pub fn last_read(&self, key: &ConversationKey) -> Option<usize> {
        self.entries.get(key).and_then(|e| e.last_read)
    }

    pub fn total(&self) -> usize {
        self.entries.values().map(|e| e.count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ConversationKey> {
        self.entries.keys()
    }

    pub fn insert(&mut self, key: ConversationKey, entry: UnreadEntry) {
        self.entries.insert(key, entry);
    }

    /// Everything in a list of `message_count` messages has been seen
    pub fn mark_read(&mut self, key: ConversationKey, message_count: usize) {
        self.entries.insert(
            key,
            UnreadEntry {
                count: 0,
                last_read: message_count.checked_sub(1),
            },
        );
    }

    /// Explicit reset: forget the read position of `key`
    pub fn reset(&mut self, key: &ConversationKey) {
        self.entries.remove(key);
    }
}
