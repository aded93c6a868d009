use async_trait::async_trait;

use crate::common::{Chat, ChatId, Message, NewChat, NewMessage, Uid, User};

use super::error::StoreResult;
use super::live::Subscription;

/// The realtime document store the client is built on.
///
/// Timestamps on chats and messages are always assigned by the store.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Creates or merges the public profile document for `user.uid`.
    async fn upsert_user(&self, user: &User) -> StoreResult<()>;

    async fn get_user(&self, uid: &Uid) -> StoreResult<Option<User>>;

    async fn get_chat(&self, id: &ChatId) -> StoreResult<Option<Chat>>;

    /// Writes the chat under an explicit id, replacing any existing record.
    async fn set_chat(&self, id: &ChatId, chat: NewChat) -> StoreResult<Chat>;

    /// Creates a chat under a store-generated id.
    async fn add_chat(&self, chat: NewChat) -> StoreResult<Chat>;

    /// Adds `uid` to the chat's participants if absent (array union) and
    /// records its name snapshot.
    async fn add_participant(
        &self,
        id: &ChatId,
        uid: &Uid,
        display_name: &str,
    ) -> StoreResult<Chat>;

    /// Appends to the chat's message sequence. Fails if the chat is unknown.
    async fn add_message(&self, chat_id: &ChatId, message: NewMessage) -> StoreResult<Message>;

    /// Updates `lastMessage` and bumps the chat's timestamp.
    async fn update_chat_summary(&self, chat_id: &ChatId, last_message: &str) -> StoreResult<()>;

    /// Chats containing `uid`, most recent first.
    async fn subscribe_chats(&self, uid: &Uid) -> StoreResult<Subscription<Vec<Chat>>>;

    /// Messages of one chat, oldest first.
    async fn subscribe_messages(
        &self,
        chat_id: &ChatId,
    ) -> StoreResult<Subscription<Vec<Message>>>;

    /// Re-delivers snapshots if the backing data changed outside this
    /// handle. Returns whether anything was refreshed.
    async fn poll_changes(&self) -> StoreResult<bool> {
        Ok(false)
    }
}
