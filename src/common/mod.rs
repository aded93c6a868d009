pub mod commands;
pub mod events;
pub mod types;

pub use commands::ChatCommand;
pub use events::{ChatEvent, Notice, NoticeLevel};
pub use types::{
    Chat, ChatId, ChatKind, InvalidChat, Message, MessageId, NewChat, NewMessage, Uid, User,
};
