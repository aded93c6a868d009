use std::time::{Duration, Instant};

use crate::common::{ChatEvent, ChatId, Notice, Uid};
use crate::session::{ChatHeader, ChatListEntry, MessageView};

/// Notices kept on screen at once; older ones are dropped first.
pub const MAX_NOTICES: usize = 4;
pub const TOAST_DURATION: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInUser {
    pub uid: Uid,
    pub display_name: String,
}

/// Local UI state, rebuilt entirely from client events.
#[derive(Default)]
pub struct AppState {
    pub user: Option<SignedInUser>,
    pub name_input: String,
    pub chats: Vec<ChatListEntry>,
    pub header: Option<ChatHeader>,
    pub messages: Vec<MessageView>,
    pub input_text: String,
    pub group_dialog_open: bool,
    pub group_name_input: String,
    pub link_input: String,
    pub pending_link: Option<String>,
    pub notices: Vec<Notice>,
    pub toast_until: Option<Instant>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_chat(&self) -> Option<&ChatId> {
        self.header.as_ref().map(|header| &header.chat_id)
    }

    pub fn apply(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::SignedIn { uid, display_name } => {
                self.name_input.clear();
                self.user = Some(SignedInUser { uid, display_name });
            }
            ChatEvent::SignedOut => {
                let pending_link = self.pending_link.take();
                *self = Self {
                    pending_link,
                    ..Self::default()
                };
            }
            ChatEvent::ChatsUpdated(chats) => self.chats = chats,
            ChatEvent::ChatOpened(header) => {
                if self.active_chat() != Some(&header.chat_id) {
                    self.messages.clear();
                }
                self.header = Some(header);
            }
            ChatEvent::ChatClosed => {
                self.header = None;
                self.messages.clear();
            }
            ChatEvent::MessagesUpdated { chat_id, messages } => {
                if self.active_chat() == Some(&chat_id) {
                    self.messages = messages;
                }
            }
            ChatEvent::DraftRestored { chat_id, text } => {
                if self.active_chat() == Some(&chat_id) && self.input_text.is_empty() {
                    self.input_text = text;
                }
            }
            ChatEvent::LinkReady(_) => self.show_toast(),
            ChatEvent::PendingLink(link) => self.pending_link = link,
            ChatEvent::Notice(notice) => self.push_notice(notice),
        }
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
        if self.notices.len() > MAX_NOTICES {
            self.notices.remove(0);
        }
    }

    pub fn show_toast(&mut self) {
        self.toast_until = Some(Instant::now() + TOAST_DURATION);
    }

    pub fn toast_visible(&self) -> bool {
        self.toast_until.is_some_and(|until| Instant::now() < until)
    }
}
