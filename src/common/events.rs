use crate::session::{ChatHeader, ChatListEntry, MessageView};

use super::types::{ChatId, Uid};

/// Events the client task sends up to the UI.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    SignedIn { uid: Uid, display_name: String },
    SignedOut,
    ChatsUpdated(Vec<ChatListEntry>),
    ChatOpened(ChatHeader),
    ChatClosed,
    MessagesUpdated {
        chat_id: ChatId,
        messages: Vec<MessageView>,
    },
    /// Composer text that never reached the store.
    DraftRestored { chat_id: ChatId, text: String },
    /// A link ready to be written to the clipboard.
    LinkReady(String),
    /// Deep link still waiting to be reconciled (`None` once handled).
    PendingLink(Option<String>),
    Notice(Notice),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A user-visible, non-fatal message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}
