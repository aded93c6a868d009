use thiserror::Error;

use crate::common::InvalidChat;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{entity} '{id}' was not found")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid chat record: {0}")]
    InvalidChat(#[from] InvalidChat),

    #[error("corrupt {entity} record '{id}': {reason}")]
    Corrupt {
        entity: &'static str,
        id: String,
        reason: String,
    },

    #[error("failed to encode {field}: {source}")]
    Encoding {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
