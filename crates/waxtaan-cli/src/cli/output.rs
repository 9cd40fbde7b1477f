//! JSON rendering of store state for stdout.

use serde_json::{json, Value};
use waxtaan_core::models::{DisplayMessage, User};
use waxtaan_core::{ChatStore, Conversation, ConversationKey};

pub fn print_json(value: &Value, pretty: bool) -> anyhow::Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    Ok(())
}

pub fn user(user: &User) -> Value {
    json!({
        "id": user.id,
        "name": user.display_name(),
        "status": user.status,
        "avatar": user.avatar,
        "contacts": user.contacts,
        "groups": user.groups,
    })
}

pub fn message(message: &DisplayMessage) -> Value {
    json!({
        "id": message.id,
        "sender": message.sender,
        "text": message.text,
        "fromMe": message.from_me,
        "timestamp": message.timestamp.to_rfc3339(),
        "time": message.time_label(),
        "type": message.kind.as_str(),
        "file": message.file,
    })
}

pub fn conversation_summary(conversation: &Conversation, unread: usize) -> Value {
    let mut value = json!({
        "key": conversation.key.to_string(),
        "name": conversation.display_name,
        "initials": conversation.initials,
        "avatar": conversation.avatar,
        "unread": unread,
        "lastMessage": conversation.last_message().map(message),
    });
    if let Some(members) = &conversation.members {
        value["members"] = members
            .iter()
            .map(|m| json!({ "id": m.id, "name": m.name }))
            .collect();
    }
    value
}

/// Most recent first, as the sidebar shows them
pub fn conversation_list(store: &ChatStore) -> Value {
    let conversations: Vec<Value> = store
        .conversations_by_recent()
        .into_iter()
        .map(|c| conversation_summary(c, store.unread_count(&c.key)))
        .collect();
    json!({
        "totalUnread": store.total_unread(),
        "selected": store.selected().map(|k| k.to_string()),
        "conversations": conversations,
    })
}

pub fn contact(user: &User) -> Value {
    json!({
        "id": user.id,
        "name": user.display_name(),
        "status": user.status,
        "avatar": user.avatar,
        "conversation": ConversationKey::user(user.id.clone()).to_string(),
    })
}

pub fn conversation_detail(conversation: &Conversation, unread: usize) -> Value {
    let mut value = conversation_summary(conversation, unread);
    value["messages"] = conversation.messages.iter().map(message).collect();
    value
}
