use super::types::ChatId;

/// Commands the UI sends down to the client task.
#[derive(Debug, Clone)]
pub enum ChatCommand {
    /// Anonymous sign-in with the chosen display name.
    SignIn { display_name: String },
    SignOut,
    /// Make `chat_id` the active chat, replacing the previous message stream.
    SelectChat(ChatId),
    /// Leave the active chat (the "back" button).
    CloseChat,
    /// Composer text for `chat_id`, which must still be the active chat.
    /// The UI has already cleared its input.
    SendMessage { chat_id: ChatId, text: String },
    CreateGroup { name: String },
    /// Build the user's own invite link for the clipboard.
    CopyInviteLink,
    /// Build a join link for a group chat.
    CopyGroupLink(ChatId),
    /// Treat `url` as the deep link the app was opened with.
    OpenLink(String),
    /// Re-run reconciliation for a deep link that failed earlier.
    RetryLink,
}
