use chrono::{DateTime, Local, Timelike, Utc};

use crate::common::{ChatId, Message, MessageId, Uid};

/// Shown in place of the time until the store assigns one.
pub const PENDING_TIME: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub id: MessageId,
    pub text: String,
    pub own: bool,
    /// Sender attribution, only for other people's messages.
    pub sender: Option<String>,
    pub time: String,
}

fn clock_label(time: &impl Timelike) -> String {
    format!("{}:{:02}", time.hour(), time.minute())
}

/// `H:MM` in local time, or the pending placeholder.
pub fn format_time(timestamp: Option<DateTime<Utc>>) -> String {
    match timestamp {
        Some(stamp) => clock_label(&stamp.with_timezone(&Local)),
        None => PENDING_TIME.to_string(),
    }
}

/// Projects a message snapshot of `chat_id` in ascending server time.
/// Messages without a timestamp go last, in snapshot order.
pub fn project_messages(messages: &[Message], chat_id: &ChatId, me: &Uid) -> Vec<MessageView> {
    let mut ordered: Vec<&Message> = messages
        .iter()
        .filter(|message| &message.chat_id == chat_id)
        .collect();
    ordered.sort_by_key(|message| (message.timestamp.is_none(), message.timestamp));

    ordered
        .into_iter()
        .map(|message| {
            let own = &message.sender_id == me;
            MessageView {
                id: message.id.clone(),
                text: message.text.clone(),
                own,
                sender: (!own && !message.sender_name.is_empty())
                    .then(|| message.sender_name.clone()),
                time: format_time(message.timestamp),
            }
        })
        .collect()
}
