//! Client-side session logic: what the signed-in user sees and does.

pub mod chat_list;
pub mod composer;
pub mod groups;
pub mod invite;
pub mod message_stream;
pub mod state;

pub use chat_list::{ChatHeader, ChatListEntry, chat_header, project_chat_list};
pub use composer::Composer;
pub use groups::create_group;
pub use invite::{InviteOutcome, InviteReconciler};
pub use message_stream::{MessageView, project_messages};
pub use state::SessionState;
