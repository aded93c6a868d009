use std::collections::BTreeMap;

use crate::common::{Chat, ChatKind, NewChat, User};
use crate::error::{ChatError, ChatResult};
use crate::storage::ChatStore;

pub const GROUP_CREATED: &str = "Group Created";

/// Creates a group owned by `me` under a store-generated id.
pub async fn create_group(store: &dyn ChatStore, me: &User, name: &str) -> ChatResult<Chat> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ChatError::EmptyGroupName);
    }

    let chat = store
        .add_chat(NewChat {
            kind: ChatKind::Group {
                name: name.to_string(),
            },
            participants: vec![me.uid.clone()],
            participant_names: BTreeMap::from([(me.uid.clone(), me.display_name.clone())]),
            last_message: GROUP_CREATED.to_string(),
        })
        .await?;
    log::info!("Created group '{name}' as {}", chat.id);
    Ok(chat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Uid;
    use crate::storage::SqliteStore;

    #[tokio::test]
    async fn creator_is_the_only_member() {
        let store = SqliteStore::in_memory().unwrap();
        let me = User {
            uid: Uid::parse("u1").unwrap(),
            display_name: "Ann".to_string(),
        };

        let chat = create_group(&store, &me, "  Weekend  ").await.unwrap();
        assert_eq!(chat.kind, ChatKind::Group { name: "Weekend".to_string() });
        assert_eq!(chat.participants, vec![me.uid.clone()]);
        assert_eq!(chat.last_message, GROUP_CREATED);

        let listed = store.subscribe_chats(&me.uid).await.unwrap().try_next().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, chat.id);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        let me = User {
            uid: Uid::parse("u1").unwrap(),
            display_name: "Ann".to_string(),
        };
        let err = create_group(&store, &me, "   ").await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyGroupName));
    }
}
