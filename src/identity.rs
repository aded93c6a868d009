//! Deterministic identity for two-party chats.
//!
//! A private chat's id is a pure function of its participant pair, so two
//! users inviting each other at the same time converge on one record.

use crate::common::{ChatId, Uid};

/// Joins the sorted pair. `Uid::parse` refuses identifiers containing it.
pub const PRIVATE_CHAT_SEPARATOR: char = '_';

/// Returns the pair in ascending order.
pub fn sorted_pair<'a>(a: &'a Uid, b: &'a Uid) -> [&'a Uid; 2] {
    if a <= b { [a, b] } else { [b, a] }
}

pub fn private_chat_id(a: &Uid, b: &Uid) -> ChatId {
    let [low, high] = sorted_pair(a, b);
    ChatId::new(format!(
        "{}{}{}",
        low.as_str(),
        PRIVATE_CHAT_SEPARATOR,
        high.as_str()
    ))
}
