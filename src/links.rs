//! Invite links and the deep link the app was opened with.

use thiserror::Error;
use url::Url;

use crate::common::{ChatId, Uid};

/// Query parameter naming the peer to start a private chat with.
pub const INVITE_PARAM: &str = "invite";
/// Query parameter naming a group chat to join.
pub const JOIN_PARAM: &str = "join";

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("invalid link '{input}': {source}")]
    Parse {
        input: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteToken {
    Peer(Uid),
    Group(ChatId),
}

/// The address the app is currently showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLink {
    url: Url,
}

impl DeepLink {
    pub fn parse(raw: &str) -> Result<Self, LinkError> {
        let url = Url::parse(raw.trim()).map_err(|source| LinkError::Parse {
            input: raw.to_string(),
            source,
        })?;
        Ok(Self { url })
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    fn param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// The invite carried by the link. A peer invite wins over a group join
    /// when both are present; malformed peer ids are ignored.
    pub fn token(&self) -> Option<InviteToken> {
        if let Some(raw) = self.param(INVITE_PARAM) {
            match Uid::parse(&raw) {
                Some(uid) => return Some(InviteToken::Peer(uid)),
                None => log::warn!("Ignoring malformed invite token '{raw}'"),
            }
        }
        self.param(JOIN_PARAM)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(|raw| InviteToken::Group(ChatId::new(raw)))
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    /// Strips invite and join parameters, keeping any others.
    pub fn clear_token(&mut self) {
        let remaining: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(key, _)| key != INVITE_PARAM && key != JOIN_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        self.url.set_query(None);
        if !remaining.is_empty() {
            self.url.query_pairs_mut().extend_pairs(remaining);
        }
    }
}

fn link_with(base: &Url, param: &str, value: &str) -> Url {
    let mut link = base.clone();
    link.set_query(None);
    link.set_fragment(None);
    link.query_pairs_mut().append_pair(param, value);
    link
}

/// `origin + path + ?invite=<uid>`.
pub fn invite_link(base: &Url, uid: &Uid) -> Url {
    link_with(base, INVITE_PARAM, uid.as_str())
}

pub fn group_link(base: &Url, chat_id: &ChatId) -> Url {
    link_with(base, JOIN_PARAM, chat_id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(raw: &str) -> Uid {
        Uid::parse(raw).unwrap()
    }

    #[test]
    fn reads_peer_invite() {
        let link = DeepLink::parse("https://chat.example/app?invite=u2").unwrap();
        assert_eq!(link.token(), Some(InviteToken::Peer(uid("u2"))));
    }

    #[test]
    fn reads_group_join() {
        let link = DeepLink::parse("https://chat.example/?join=abc123").unwrap();
        assert_eq!(
            link.token(),
            Some(InviteToken::Group(ChatId::new("abc123")))
        );
    }

    #[test]
    fn empty_or_malformed_tokens_are_ignored() {
        assert_eq!(DeepLink::parse("https://chat.example/?invite=").unwrap().token(), None);
        assert_eq!(
            DeepLink::parse("https://chat.example/?invite=a_b").unwrap().token(),
            None
        );
        assert!(!DeepLink::parse("https://chat.example/").unwrap().has_token());
    }

    #[test]
    fn clearing_keeps_other_params() {
        let mut link =
            DeepLink::parse("https://chat.example/app?theme=dark&invite=u2#top").unwrap();
        link.clear_token();
        assert_eq!(link.as_str(), "https://chat.example/app?theme=dark#top");

        let mut link = DeepLink::parse("https://chat.example/app?invite=u2").unwrap();
        link.clear_token();
        assert_eq!(link.as_str(), "https://chat.example/app");
        assert!(!link.has_token());
    }

    #[test]
    fn invite_link_replaces_query() {
        let base = Url::parse("https://chat.example/app?old=1#frag").unwrap();
        assert_eq!(
            invite_link(&base, &uid("u1")).as_str(),
            "https://chat.example/app?invite=u1"
        );
        assert_eq!(
            group_link(&base, &ChatId::new("g1")).as_str(),
            "https://chat.example/app?join=g1"
        );
    }

    #[test]
    fn invite_link_round_trips_through_deep_link() {
        let base = Url::parse("https://chat.example/").unwrap();
        let link = DeepLink::parse(invite_link(&base, &uid("abc")).as_str()).unwrap();
        assert_eq!(link.token(), Some(InviteToken::Peer(uid("abc"))));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            DeepLink::parse("not a url"),
            Err(LinkError::Parse { .. })
        ));
    }
}
