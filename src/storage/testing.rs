//! Store wrapper that fails selected operations on demand.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::common::{Chat, ChatId, Message, NewChat, NewMessage, Uid, User};

use super::error::{StoreError, StoreResult};
use super::live::Subscription;
use super::sqlite::SqliteStore;
use super::store::ChatStore;

#[derive(Default)]
pub struct Faults {
    pub get_user: AtomicBool,
    pub set_chat: AtomicBool,
    pub add_message: AtomicBool,
    pub update_summary: AtomicBool,
}

pub struct FlakyStore {
    pub inner: SqliteStore,
    pub faults: Faults,
    pub chat_writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::in_memory().unwrap(),
            faults: Faults::default(),
            chat_writes: AtomicUsize::new(0),
        }
    }

    fn check(flag: &AtomicBool, operation: &str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("{operation} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatStore for FlakyStore {
    async fn upsert_user(&self, user: &User) -> StoreResult<()> {
        self.inner.upsert_user(user).await
    }

    async fn get_user(&self, uid: &Uid) -> StoreResult<Option<User>> {
        Self::check(&self.faults.get_user, "get_user")?;
        self.inner.get_user(uid).await
    }

    async fn get_chat(&self, id: &ChatId) -> StoreResult<Option<Chat>> {
        self.inner.get_chat(id).await
    }

    async fn set_chat(&self, id: &ChatId, chat: NewChat) -> StoreResult<Chat> {
        Self::check(&self.faults.set_chat, "set_chat")?;
        self.chat_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_chat(id, chat).await
    }

    async fn add_chat(&self, chat: NewChat) -> StoreResult<Chat> {
        Self::check(&self.faults.set_chat, "add_chat")?;
        self.chat_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.add_chat(chat).await
    }

    async fn add_participant(
        &self,
        id: &ChatId,
        uid: &Uid,
        display_name: &str,
    ) -> StoreResult<Chat> {
        self.inner.add_participant(id, uid, display_name).await
    }

    async fn add_message(&self, chat_id: &ChatId, message: NewMessage) -> StoreResult<Message> {
        Self::check(&self.faults.add_message, "add_message")?;
        self.inner.add_message(chat_id, message).await
    }

    async fn update_chat_summary(&self, chat_id: &ChatId, last_message: &str) -> StoreResult<()> {
        Self::check(&self.faults.update_summary, "update_chat_summary")?;
        self.inner.update_chat_summary(chat_id, last_message).await
    }

    async fn subscribe_chats(&self, uid: &Uid) -> StoreResult<Subscription<Vec<Chat>>> {
        self.inner.subscribe_chats(uid).await
    }

    async fn subscribe_messages(
        &self,
        chat_id: &ChatId,
    ) -> StoreResult<Subscription<Vec<Message>>> {
        self.inner.subscribe_messages(chat_id).await
    }
}
