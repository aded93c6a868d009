//! Turns an invite link into an existing, opened chat.

use std::collections::BTreeMap;

use crate::common::{Chat, ChatId, ChatKind, NewChat, Uid, User};
use crate::error::ChatResult;
use crate::identity::{private_chat_id, sorted_pair};
use crate::links::{DeepLink, InviteToken};
use crate::storage::{ChatStore, StoreError};

/// Summary stored on a private chat created from a link.
pub const INVITE_SUMMARY: &str = "Chat created via link";
/// Name snapshot used when the peer has no profile record.
pub const UNKNOWN_PEER: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteOutcome {
    /// No token, or the token named the current user.
    Ignored,
    /// Private chat with the inviting peer; `created` is false if it existed.
    Opened { chat_id: ChatId, created: bool },
    /// Group chat reached through a join link.
    Joined {
        chat_id: ChatId,
        already_member: bool,
    },
}

impl InviteOutcome {
    pub fn chat_id(&self) -> Option<&ChatId> {
        match self {
            InviteOutcome::Ignored => None,
            InviteOutcome::Opened { chat_id, .. } | InviteOutcome::Joined { chat_id, .. } => {
                Some(chat_id)
            }
        }
    }
}

pub struct InviteReconciler<'a> {
    store: &'a dyn ChatStore,
}

impl<'a> InviteReconciler<'a> {
    pub fn new(store: &'a dyn ChatStore) -> Self {
        Self { store }
    }

    /// Resolves the link's token for `me`. The token is stripped from the
    /// link only once the chat is known to exist, so a failed attempt can be
    /// retried with the same link.
    pub async fn reconcile(&self, me: &User, link: &mut DeepLink) -> ChatResult<InviteOutcome> {
        let outcome = match link.token() {
            None => return Ok(InviteOutcome::Ignored),
            Some(InviteToken::Peer(peer)) if peer == me.uid => {
                log::debug!("Ignoring self-invite for {peer}");
                return Ok(InviteOutcome::Ignored);
            }
            Some(InviteToken::Peer(peer)) => self.open_private(me, &peer).await?,
            Some(InviteToken::Group(chat_id)) => self.join_group(me, &chat_id).await?,
        };

        link.clear_token();
        Ok(outcome)
    }

    /// Ensures the private chat between `me` and `peer` exists.
    pub async fn open_private(&self, me: &User, peer: &Uid) -> ChatResult<InviteOutcome> {
        let chat_id = private_chat_id(&me.uid, peer);
        if self.store.get_chat(&chat_id).await?.is_some() {
            log::info!("Invite resolved to existing chat {chat_id}");
            return Ok(InviteOutcome::Opened {
                chat_id,
                created: false,
            });
        }

        let chat = self.create_private(me, peer).await?;
        log::info!("Created private chat {} via invite", chat.id);
        Ok(InviteOutcome::Opened {
            chat_id: chat.id,
            created: true,
        })
    }

    /// Writes the private chat record under its derived id. Two peers racing
    /// here write the same logical record, so the later write overwrites
    /// rather than duplicates.
    pub async fn create_private(&self, me: &User, peer: &Uid) -> ChatResult<Chat> {
        let peer_name = match self.store.get_user(peer).await? {
            Some(profile) => profile.display_name,
            None => {
                log::info!("No profile for invited peer {peer}");
                UNKNOWN_PEER.to_string()
            }
        };

        let chat_id = private_chat_id(&me.uid, peer);
        let [low, high] = sorted_pair(&me.uid, peer);
        let chat = NewChat {
            kind: ChatKind::Private,
            participants: vec![low.clone(), high.clone()],
            participant_names: BTreeMap::from([
                (me.uid.clone(), me.display_name.clone()),
                (peer.clone(), peer_name),
            ]),
            last_message: INVITE_SUMMARY.to_string(),
        };
        Ok(self.store.set_chat(&chat_id, chat).await?)
    }

    /// Adds `me` to an existing group.
    pub async fn join_group(&self, me: &User, chat_id: &ChatId) -> ChatResult<InviteOutcome> {
        let chat = self
            .store
            .get_chat(chat_id)
            .await?
            .filter(|chat| chat.kind.is_group())
            .ok_or_else(|| StoreError::not_found("group", chat_id.as_str()))?;

        let already_member = chat.has_participant(&me.uid);
        if !already_member {
            self.store
                .add_participant(chat_id, &me.uid, &me.display_name)
                .await?;
            log::info!("Joined group {chat_id}");
        }
        Ok(InviteOutcome::Joined {
            chat_id: chat_id.clone(),
            already_member,
        })
    }
}
