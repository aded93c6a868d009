use crate::common::{ChatId, Message, NewMessage, User};
use crate::error::{ChatError, ChatResult};
use crate::storage::ChatStore;

/// Sends messages into a chat and keeps the chat summary in step.
pub struct Composer<'a> {
    store: &'a dyn ChatStore,
}

impl<'a> Composer<'a> {
    pub fn new(store: &'a dyn ChatStore) -> Self {
        Self { store }
    }

    /// Appends `text` (trimmed) to the chat, then updates the chat's
    /// `lastMessage`. Whitespace-only input is dropped with no writes.
    ///
    /// A failed append returns the original text in
    /// [`ChatError::MessageNotSent`] so the caller can restore the draft.
    pub async fn send(
        &self,
        me: &User,
        chat_id: &ChatId,
        text: &str,
    ) -> ChatResult<Option<Message>> {
        let body = text.trim();
        if body.is_empty() {
            return Ok(None);
        }

        let message = self
            .store
            .add_message(
                chat_id,
                NewMessage {
                    sender_id: me.uid.clone(),
                    sender_name: me.display_name.clone(),
                    text: body.to_string(),
                },
            )
            .await
            .map_err(|source| ChatError::MessageNotSent {
                chat_id: chat_id.clone(),
                text: text.to_string(),
                source,
            })?;

        self.store
            .update_chat_summary(chat_id, body)
            .await
            .map_err(|source| ChatError::SummaryNotUpdated {
                chat_id: chat_id.clone(),
                source,
            })?;

        log::debug!("Sent message {} to {chat_id}", message.id.as_str());
        Ok(Some(message))
    }
}
