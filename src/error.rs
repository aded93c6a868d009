use thiserror::Error;

use crate::auth::AuthError;
use crate::common::ChatId;
use crate::links::LinkError;
use crate::storage::StoreError;

/// Recoverable failures surfaced to the user. None of them end the session.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("you need to sign in first")]
    NotSignedIn,

    /// The composer targeted a chat that is no longer the open one.
    #[error("chat {chat_id} is no longer open; message was not sent")]
    ChatNotOpen { chat_id: ChatId, text: String },

    #[error("group name must not be empty")]
    EmptyGroupName,

    /// The message never reached the store; `text` is handed back for re-entry.
    #[error("message was not sent: {source}")]
    MessageNotSent {
        chat_id: ChatId,
        text: String,
        #[source]
        source: StoreError,
    },

    /// The message was stored but the chat summary was not updated.
    #[error("message sent, but the chat list could not be updated: {source}")]
    SummaryNotUpdated {
        chat_id: ChatId,
        #[source]
        source: StoreError,
    },
}

pub type ChatResult<T> = Result<T, ChatError>;
