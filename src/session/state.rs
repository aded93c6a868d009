use std::future;

use crate::common::{ChatId, Message, User};
use crate::storage::{ChatStore, StoreResult, Subscription};

struct ActiveChat {
    chat_id: ChatId,
    stream: Subscription<Vec<Message>>,
}

/// Per-user session: who is signed in, which chat is open, and the one
/// message subscription that belongs to it.
///
/// Only `select_chat` and `close_chat` change the active chat, and each
/// tears the old stream down before anything else happens.
pub struct SessionState {
    user: User,
    active: Option<ActiveChat>,
}

impl SessionState {
    pub fn new(user: User) -> Self {
        Self { user, active: None }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn set_display_name(&mut self, display_name: &str) {
        self.user.display_name = display_name.to_string();
    }

    pub fn active_chat(&self) -> Option<&ChatId> {
        self.active.as_ref().map(|active| &active.chat_id)
    }

    /// Replaces the active message stream with one for `chat_id`. If the new
    /// subscription cannot be opened, no chat is active afterwards.
    pub async fn select_chat(
        &mut self,
        store: &dyn ChatStore,
        chat_id: &ChatId,
    ) -> StoreResult<()> {
        if let Some(previous) = self.active.take() {
            log::debug!("Cancelling message stream for {}", previous.chat_id);
            previous.stream.cancel();
        }

        let stream = store.subscribe_messages(chat_id).await?;
        log::info!("Opened chat {chat_id}");
        self.active = Some(ActiveChat {
            chat_id: chat_id.clone(),
            stream,
        });
        Ok(())
    }

    pub fn close_chat(&mut self) -> Option<ChatId> {
        self.active.take().map(|active| {
            active.stream.cancel();
            active.chat_id
        })
    }

    /// Next message snapshot of the active chat. Never resolves while no
    /// chat is active.
    pub async fn next_messages(&mut self) -> (ChatId, Vec<Message>) {
        loop {
            let Some(active) = self.active.as_mut() else {
                return future::pending().await;
            };
            if let Some(messages) = active.stream.next().await {
                return (active.chat_id.clone(), messages);
            }
            log::warn!("Message stream for {} closed", active.chat_id);
            self.active = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::common::{ChatKind, NewChat, NewMessage, Uid};
    use crate::storage::SqliteStore;

    fn user(raw: &str) -> User {
        User {
            uid: Uid::parse(raw).unwrap(),
            display_name: raw.to_uppercase(),
        }
    }

    async fn group(store: &SqliteStore, owner: &User, name: &str) -> ChatId {
        store
            .add_chat(NewChat {
                kind: ChatKind::Group {
                    name: name.to_string(),
                },
                participants: vec![owner.uid.clone()],
                participant_names: BTreeMap::from([(
                    owner.uid.clone(),
                    owner.display_name.clone(),
                )]),
                last_message: "Group Created".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    async fn post(store: &SqliteStore, chat: &ChatId, sender: &User, text: &str) {
        store
            .add_message(
                chat,
                NewMessage {
                    sender_id: sender.uid.clone(),
                    sender_name: sender.display_name.clone(),
                    text: text.to_string(),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn switching_chats_silences_the_previous_stream() {
        let store = SqliteStore::in_memory().unwrap();
        let me = user("u1");
        let a = group(&store, &me, "a").await;
        let b = group(&store, &me, "b").await;
        let mut session = SessionState::new(me.clone());

        session.select_chat(&store, &a).await.unwrap();
        assert_eq!(session.next_messages().await.0, a);

        session.select_chat(&store, &b).await.unwrap();
        assert_eq!(session.next_messages().await, (b.clone(), vec![]));
        assert_eq!(store.listener_count(), 1);

        post(&store, &a, &me, "to a").await;
        assert!(
            timeout(Duration::from_millis(50), session.next_messages())
                .await
                .is_err()
        );

        post(&store, &b, &me, "to b").await;
        let (chat, messages) = session.next_messages().await;
        assert_eq!(chat, b);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "to b");
    }

    #[tokio::test]
    async fn closing_cancels_the_stream() {
        let store = SqliteStore::in_memory().unwrap();
        let me = user("u1");
        let a = group(&store, &me, "a").await;
        let mut session = SessionState::new(me);

        session.select_chat(&store, &a).await.unwrap();
        assert_eq!(session.close_chat(), Some(a));
        assert_eq!(session.active_chat(), None);
        assert_eq!(store.listener_count(), 0);
        assert!(
            timeout(Duration::from_millis(20), session.next_messages())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn reselecting_keeps_a_single_subscription() {
        let store = SqliteStore::in_memory().unwrap();
        let me = user("u1");
        let a = group(&store, &me, "a").await;
        let mut session = SessionState::new(me);

        for _ in 0..3 {
            session.select_chat(&store, &a).await.unwrap();
        }
        assert_eq!(store.listener_count(), 1);
        assert_eq!(session.active_chat(), Some(&a));
    }
}
