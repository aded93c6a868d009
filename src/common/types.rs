use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{self, PRIVATE_CHAT_SEPARATOR};

/// Opaque user identifier assigned by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uid(String);

impl Uid {
    /// Accepts a trimmed, non-empty identifier that cannot be confused with
    /// a derived private chat id.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty()
            || raw.contains(PRIVATE_CHAT_SEPARATOR)
            || raw.contains(char::is_whitespace)
        {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    /// Fresh identifier for an anonymous account.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Uid {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Uid::parse(&raw).ok_or_else(|| format!("invalid uid '{raw}'"))
    }
}

impl From<Uid> for String {
    fn from(uid: Uid) -> Self {
        uid.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChatId(String);

impl ChatId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Public profile record other participants resolve names from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub uid: Uid,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group {
        name: String,
    },
}

impl ChatKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChatKind::Private => "private",
            ChatKind::Group { .. } => "group",
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, ChatKind::Group { .. })
    }
}

/// A conversation record as stored by the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: ChatId,
    pub kind: ChatKind,
    pub participants: Vec<Uid>,
    pub participant_names: BTreeMap<Uid, String>,
    pub last_message: String,
    /// `None` until the store has assigned a server time.
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidChat {
    #[error("chat {0} has no participants")]
    NoParticipants(ChatId),
    #[error("chat {0} lists participant {1} more than once")]
    DuplicateParticipant(ChatId, Uid),
    #[error("private chat {0} must have exactly two participants, found {1}")]
    PrivateArity(ChatId, usize),
    #[error("private chat id {actual} does not match its participants (expected {expected})")]
    PrivateIdMismatch { actual: ChatId, expected: ChatId },
    #[error("group chat {0} has an empty name")]
    EmptyGroupName(ChatId),
}

impl Chat {
    /// Checks the record invariants. Called wherever documents enter the
    /// process from the store.
    pub fn validate(&self) -> Result<(), InvalidChat> {
        if self.participants.is_empty() {
            return Err(InvalidChat::NoParticipants(self.id.clone()));
        }
        for (index, uid) in self.participants.iter().enumerate() {
            if self.participants[..index].contains(uid) {
                return Err(InvalidChat::DuplicateParticipant(
                    self.id.clone(),
                    uid.clone(),
                ));
            }
        }

        match &self.kind {
            ChatKind::Private => {
                let [a, b] = self.participants.as_slice() else {
                    return Err(InvalidChat::PrivateArity(
                        self.id.clone(),
                        self.participants.len(),
                    ));
                };
                let expected = identity::private_chat_id(a, b);
                if expected != self.id {
                    return Err(InvalidChat::PrivateIdMismatch {
                        actual: self.id.clone(),
                        expected,
                    });
                }
            }
            ChatKind::Group { name } => {
                if name.trim().is_empty() {
                    return Err(InvalidChat::EmptyGroupName(self.id.clone()));
                }
            }
        }
        Ok(())
    }

    pub fn has_participant(&self, uid: &Uid) -> bool {
        self.participants.contains(uid)
    }

    /// The first participant that is not `me`.
    pub fn other_participant(&self, me: &Uid) -> Option<&Uid> {
        self.participants.iter().find(|uid| *uid != me)
    }
}

/// Fields supplied by the writer; id and timestamp come from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChat {
    pub kind: ChatKind,
    pub participants: Vec<Uid>,
    pub participant_names: BTreeMap<Uid, String>,
    pub last_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: Uid,
    pub sender_name: String,
    pub text: String,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub sender_id: Uid,
    pub sender_name: String,
    pub text: String,
}
