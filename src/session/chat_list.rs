use chrono::{DateTime, Utc};

use crate::common::{Chat, ChatId, ChatKind, Uid};

/// Title for a private chat whose name snapshot lacks the peer.
pub const UNNAMED_PEER: &str = "User";
pub const EMPTY_PREVIEW: &str = "No messages yet";

/// One row of the chat list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatListEntry {
    pub chat_id: ChatId,
    pub title: String,
    pub avatar: String,
    pub preview: String,
    pub is_group: bool,
    pub timestamp: Option<DateTime<Utc>>,
    pub active: bool,
}

/// What the message pane shows above the messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHeader {
    pub chat_id: ChatId,
    pub title: String,
    pub status: String,
    pub is_group: bool,
}

/// Group chats show their name; private chats show the other participant's
/// name from the stored snapshot.
pub fn chat_title(chat: &Chat, me: &Uid) -> String {
    match &chat.kind {
        ChatKind::Group { name } => name.clone(),
        ChatKind::Private => chat
            .other_participant(me)
            .and_then(|peer| chat.participant_names.get(peer))
            .filter(|name| !name.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| UNNAMED_PEER.to_string()),
    }
}

pub fn avatar_initial(title: &str) -> String {
    title
        .trim()
        .chars()
        .next()
        .map(|initial| initial.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_string())
}

pub fn chat_header(chat: &Chat, me: &Uid) -> ChatHeader {
    ChatHeader {
        chat_id: chat.id.clone(),
        title: chat_title(chat, me),
        status: if chat.kind.is_group() {
            "Group Chat".to_string()
        } else {
            "Private".to_string()
        },
        is_group: chat.kind.is_group(),
    }
}

/// Projects a chat-list snapshot, most recent activity first. At most one
/// entry is active.
pub fn project_chat_list(
    chats: &[Chat],
    me: &Uid,
    active: Option<&ChatId>,
) -> Vec<ChatListEntry> {
    let mut visible: Vec<&Chat> = chats
        .iter()
        .filter(|chat| chat.has_participant(me))
        .collect();
    // Unstamped chats sort last; ties keep snapshot order.
    visible.sort_by(|a, b| match (a.timestamp, b.timestamp) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    let mut seen_active = false;
    visible
        .into_iter()
        .map(|chat| {
            let title = chat_title(chat, me);
            let active = !seen_active && active == Some(&chat.id);
            seen_active |= active;
            ChatListEntry {
                chat_id: chat.id.clone(),
                avatar: avatar_initial(&title),
                title,
                preview: if chat.last_message.is_empty() {
                    EMPTY_PREVIEW.to_string()
                } else {
                    chat.last_message.clone()
                },
                is_group: chat.kind.is_group(),
                timestamp: chat.timestamp,
                active,
            }
        })
        .collect()
}
