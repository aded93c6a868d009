use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Result as SqlResult, ToSql, params};

use crate::common::{
    Chat, ChatId, ChatKind, Message, MessageId, NewChat, NewMessage, Uid, User,
};

use super::clock::ServerClock;
use super::database::Database;
use super::error::{StoreError, StoreResult};
use super::live::{LiveRegistry, Subscription};
use super::store::ChatStore;

impl ToSql for Uid {
    fn to_sql(&self) -> SqlResult<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Uid {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        Uid::parse(raw)
            .ok_or_else(|| FromSqlError::Other(format!("invalid uid '{raw}'").into()))
    }
}

impl ToSql for ChatId {
    fn to_sql(&self) -> SqlResult<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ChatId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().map(ChatId::new)
    }
}

fn to_millis(timestamp: Option<DateTime<Utc>>) -> Option<i64> {
    timestamp.map(|stamp| stamp.timestamp_millis())
}

fn from_millis(millis: Option<i64>) -> Option<DateTime<Utc>> {
    millis.and_then(DateTime::from_timestamp_millis)
}

/// Raw `chats` row before participants are joined in.
struct ChatRow {
    id: ChatId,
    kind: String,
    group_name: Option<String>,
    participant_names: String,
    last_message: String,
    timestamp: Option<i64>,
}

const CHAT_COLUMNS: &str =
    "c.id, c.type, c.group_name, c.participant_names, c.last_message, c.timestamp";

fn chat_row(row: &rusqlite::Row<'_>) -> SqlResult<ChatRow> {
    Ok(ChatRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        group_name: row.get(2)?,
        participant_names: row.get(3)?,
        last_message: row.get(4)?,
        timestamp: row.get(5)?,
    })
}

/// Reads a `messages` row selected with a leading `seq` column.
fn message_row(row: &rusqlite::Row<'_>) -> SqlResult<Message> {
    Ok(Message {
        id: MessageId::new(row.get::<_, String>(1)?),
        chat_id: row.get(2)?,
        sender_id: row.get(3)?,
        sender_name: row.get(4)?,
        text: row.get(5)?,
        timestamp: from_millis(row.get(6)?),
    })
}

mod queries {
    use super::*;

    pub(super) fn init_schema(conn: &Connection) -> SqlResult<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                uid TEXT PRIMARY KEY,
                display_name TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS chats (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL CHECK (type IN ('private', 'group')),
                group_name TEXT,
                participant_names TEXT NOT NULL DEFAULT '{}',
                last_message TEXT NOT NULL DEFAULT '',
                timestamp INTEGER
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS chat_participants (
                chat_id TEXT NOT NULL REFERENCES chats(id),
                uid TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (chat_id, uid)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                chat_id TEXT NOT NULL REFERENCES chats(id),
                sender_id TEXT NOT NULL,
                sender_name TEXT NOT NULL,
                text TEXT NOT NULL,
                timestamp INTEGER
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_participants_uid ON chat_participants(uid)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_chat_timestamp
             ON messages(chat_id, timestamp, seq)",
            [],
        )?;

        Ok(())
    }

    pub(super) fn get_user(conn: &Connection, uid: &Uid) -> SqlResult<Option<User>> {
        conn.query_row(
            "SELECT uid, display_name FROM users WHERE uid = ?1",
            params![uid],
            |row| {
                Ok(User {
                    uid: row.get(0)?,
                    display_name: row.get(1)?,
                })
            },
        )
        .optional()
    }

    pub(super) fn upsert_user(conn: &Connection, user: &User) -> SqlResult<()> {
        conn.execute(
            "INSERT INTO users (uid, display_name) VALUES (?1, ?2)
             ON CONFLICT(uid) DO UPDATE SET display_name = excluded.display_name",
            params![user.uid, user.display_name],
        )?;
        Ok(())
    }

    pub(super) fn participants(conn: &Connection, chat_id: &ChatId) -> SqlResult<Vec<Uid>> {
        let mut stmt = conn.prepare(
            "SELECT uid FROM chat_participants WHERE chat_id = ?1 ORDER BY position ASC",
        )?;
        let participants = stmt
            .query_map(params![chat_id], |row| row.get(0))?
            .collect::<SqlResult<Vec<Uid>>>()?;
        Ok(participants)
    }

    pub(super) fn assemble(conn: &Connection, row: ChatRow) -> StoreResult<Chat> {
        let participants = participants(conn, &row.id)?;
        let participant_names: BTreeMap<Uid, String> =
            serde_json::from_str(&row.participant_names).map_err(|err| StoreError::Corrupt {
                entity: "chat",
                id: row.id.to_string(),
                reason: format!("participant names: {err}"),
            })?;

        let kind = match row.kind.as_str() {
            "private" => ChatKind::Private,
            "group" => ChatKind::Group {
                name: row.group_name.unwrap_or_default(),
            },
            other => {
                return Err(StoreError::Corrupt {
                    entity: "chat",
                    id: row.id.to_string(),
                    reason: format!("unknown chat type '{other}'"),
                });
            }
        };

        let chat = Chat {
            id: row.id,
            kind,
            participants,
            participant_names,
            last_message: row.last_message,
            timestamp: from_millis(row.timestamp),
        };
        chat.validate()?;
        Ok(chat)
    }

    pub(super) fn get_chat(conn: &Connection, id: &ChatId) -> StoreResult<Option<Chat>> {
        let row = conn
            .query_row(
                &format!("SELECT {CHAT_COLUMNS} FROM chats c WHERE c.id = ?1"),
                params![id],
                chat_row,
            )
            .optional()?;
        row.map(|row| assemble(conn, row)).transpose()
    }

    pub(super) fn chat_exists(conn: &Connection, id: &ChatId) -> SqlResult<bool> {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM chats WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )
    }

    /// Chats containing `uid`, newest first. Records that fail validation are
    /// logged and skipped.
    pub(super) fn chats_for(conn: &Connection, uid: &Uid) -> StoreResult<Vec<Chat>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHAT_COLUMNS}
             FROM chats c
             JOIN chat_participants p ON p.chat_id = c.id
             WHERE p.uid = ?1
             ORDER BY c.timestamp IS NULL, c.timestamp DESC, c.id ASC"
        ))?;
        let rows = stmt
            .query_map(params![uid], chat_row)?
            .collect::<SqlResult<Vec<_>>>()?;

        let mut chats = Vec::with_capacity(rows.len());
        for row in rows {
            match assemble(conn, row) {
                Ok(chat) => chats.push(chat),
                Err(err @ (StoreError::InvalidChat(_) | StoreError::Corrupt { .. })) => {
                    log::warn!("Skipping chat in list for {uid}: {err}");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(chats)
    }

    pub(super) fn write_chat(conn: &Connection, chat: &Chat) -> StoreResult<()> {
        let names = serde_json::to_string(&chat.participant_names).map_err(|source| {
            StoreError::Encoding {
                field: "participant_names",
                source,
            }
        })?;
        let group_name = match &chat.kind {
            ChatKind::Group { name } => Some(name.as_str()),
            ChatKind::Private => None,
        };

        conn.execute(
            "INSERT INTO chats (id, type, group_name, participant_names, last_message, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                type = excluded.type,
                group_name = excluded.group_name,
                participant_names = excluded.participant_names,
                last_message = excluded.last_message,
                timestamp = excluded.timestamp",
            params![
                chat.id,
                chat.kind.label(),
                group_name,
                names,
                chat.last_message,
                to_millis(chat.timestamp)
            ],
        )?;

        conn.execute(
            "DELETE FROM chat_participants WHERE chat_id = ?1",
            params![chat.id],
        )?;
        for (position, uid) in chat.participants.iter().enumerate() {
            conn.execute(
                "INSERT INTO chat_participants (chat_id, uid, position) VALUES (?1, ?2, ?3)",
                params![chat.id, uid, position as i64],
            )?;
        }
        Ok(())
    }

    pub(super) fn insert_message(conn: &Connection, message: &Message) -> SqlResult<()> {
        conn.execute(
            "INSERT INTO messages (id, chat_id, sender_id, sender_name, text, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id.as_str(),
                message.chat_id,
                message.sender_id,
                message.sender_name,
                message.text,
                to_millis(message.timestamp)
            ],
        )?;
        Ok(())
    }

    /// Messages of one chat, oldest first. Rows with an unreadable sender
    /// or blank text are logged and skipped.
    pub(super) fn messages_for(conn: &Connection, chat_id: &ChatId) -> SqlResult<Vec<Message>> {
        let mut stmt = conn.prepare(
            "SELECT seq, id, chat_id, sender_id, sender_name, text, timestamp
             FROM messages
             WHERE chat_id = ?1
             ORDER BY timestamp IS NULL, timestamp ASC, seq ASC",
        )?;
        let rows = stmt
            .query_map(params![chat_id], |row| {
                Ok((row.get::<_, i64>(0)?, message_row(row)))
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        let mut messages = Vec::with_capacity(rows.len());
        for (seq, message) in rows {
            match message {
                Ok(message) if message.text.trim().is_empty() => {
                    log::warn!(
                        "Skipping blank message {} in chat {chat_id}",
                        message.id.as_str()
                    );
                }
                Ok(message) => messages.push(message),
                Err(err) => log::warn!("Skipping message #{seq} in chat {chat_id}: {err}"),
            }
        }
        Ok(messages)
    }

    pub(super) fn update_summary(
        conn: &Connection,
        chat_id: &ChatId,
        last_message: &str,
        timestamp: DateTime<Utc>,
    ) -> SqlResult<usize> {
        conn.execute(
            "UPDATE chats SET last_message = ?1, timestamp = ?2 WHERE id = ?3",
            params![last_message, timestamp.timestamp_millis(), chat_id],
        )
    }
}

/// Document store backed by one SQLite file. Several processes may share
/// the file; `poll_changes` picks up their commits.
pub struct SqliteStore {
    db: Mutex<Database>,
    clock: ServerClock,
    chat_lists: LiveRegistry<Uid, Vec<Chat>>,
    message_streams: LiveRegistry<ChatId, Vec<Message>>,
    data_version: AtomicI64,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::with_database(Database::new(path)?)
    }

    pub fn in_memory() -> StoreResult<Self> {
        Self::with_database(Database::in_memory()?)
    }

    pub fn with_database(db: Database) -> StoreResult<Self> {
        queries::init_schema(db.connection())?;
        let data_version = db.data_version()?;
        Ok(Self {
            db: Mutex::new(db),
            clock: ServerClock::new(),
            chat_lists: LiveRegistry::default(),
            message_streams: LiveRegistry::default(),
            data_version: AtomicI64::new(data_version),
        })
    }

    /// Number of live listeners, chat lists and message streams combined.
    pub fn listener_count(&self) -> usize {
        self.chat_lists.len() + self.message_streams.len()
    }

    fn refresh_chat_lists(&self, conn: &Connection, affected: &[Uid]) {
        for uid in self.chat_lists.active_keys() {
            if !affected.contains(&uid) {
                continue;
            }
            match queries::chats_for(conn, &uid) {
                Ok(chats) => self.chat_lists.publish(&uid, chats),
                Err(err) => log::warn!("Failed to refresh chat list for {uid}: {err}"),
            }
        }
    }

    fn refresh_messages(&self, conn: &Connection, chat_id: &ChatId) {
        if !self.message_streams.has_listeners(chat_id) {
            return;
        }
        match queries::messages_for(conn, chat_id) {
            Ok(messages) => self.message_streams.publish(chat_id, messages),
            Err(err) => log::warn!("Failed to refresh messages for chat {chat_id}: {err}"),
        }
    }

    fn refresh_all(&self, conn: &Connection) {
        let uids = self.chat_lists.active_keys();
        self.refresh_chat_lists(conn, &uids);
        for chat_id in self.message_streams.active_keys() {
            self.refresh_messages(conn, &chat_id);
        }
    }

    /// Writes `chat` in one transaction and notifies old and new members.
    fn store_chat(&self, chat: Chat) -> StoreResult<Chat> {
        chat.validate()?;
        let mut db = self.db.lock();

        let previous = queries::participants(db.connection(), &chat.id)?;
        let tx = db.connection_mut().transaction()?;
        queries::write_chat(&tx, &chat)?;
        tx.commit()?;

        let mut affected = previous;
        affected.extend(chat.participants.iter().cloned());
        self.refresh_chat_lists(db.connection(), &affected);
        Ok(chat)
    }

    fn stamp(&self, id: ChatId, chat: NewChat) -> Chat {
        Chat {
            id,
            kind: chat.kind,
            participants: chat.participants,
            participant_names: chat.participant_names,
            last_message: chat.last_message,
            timestamp: Some(self.clock.now()),
        }
    }

    fn join_chat(&self, id: &ChatId, uid: &Uid, display_name: &str) -> StoreResult<Chat> {
        let mut db = self.db.lock();
        let mut chat = queries::get_chat(db.connection(), id)?
            .ok_or_else(|| StoreError::not_found("chat", id.as_str()))?;

        if !chat.has_participant(uid) {
            chat.participants.push(uid.clone());
        }
        chat.participant_names.insert(uid.clone(), display_name.to_string());
        chat.validate()?;

        let tx = db.connection_mut().transaction()?;
        queries::write_chat(&tx, &chat)?;
        tx.commit()?;

        self.refresh_chat_lists(db.connection(), &chat.participants);
        Ok(chat)
    }

    fn append_message(&self, chat_id: &ChatId, message: NewMessage) -> StoreResult<Message> {
        let db = self.db.lock();
        if !queries::chat_exists(db.connection(), chat_id)? {
            return Err(StoreError::not_found("chat", chat_id.as_str()));
        }

        let message = Message {
            id: MessageId::generate(),
            chat_id: chat_id.clone(),
            sender_id: message.sender_id,
            sender_name: message.sender_name,
            text: message.text,
            timestamp: Some(self.clock.now()),
        };
        queries::insert_message(db.connection(), &message)?;
        self.refresh_messages(db.connection(), chat_id);
        Ok(message)
    }

    fn touch_chat(&self, chat_id: &ChatId, last_message: &str) -> StoreResult<()> {
        let db = self.db.lock();
        let updated =
            queries::update_summary(db.connection(), chat_id, last_message, self.clock.now())?;
        if updated == 0 {
            return Err(StoreError::not_found("chat", chat_id.as_str()));
        }
        let members = queries::participants(db.connection(), chat_id)?;
        self.refresh_chat_lists(db.connection(), &members);
        Ok(())
    }

    fn check_external_changes(&self) -> StoreResult<bool> {
        let db = self.db.lock();
        let version = db.data_version()?;
        if self.data_version.swap(version, Ordering::SeqCst) == version {
            return Ok(false);
        }
        log::debug!("Store file changed externally; refreshing live queries");
        self.refresh_all(db.connection());
        Ok(true)
    }
}

#[async_trait]
impl ChatStore for SqliteStore {
    async fn upsert_user(&self, user: &User) -> StoreResult<()> {
        let db = self.db.lock();
        queries::upsert_user(db.connection(), user)?;
        Ok(())
    }

    async fn get_user(&self, uid: &Uid) -> StoreResult<Option<User>> {
        let db = self.db.lock();
        Ok(queries::get_user(db.connection(), uid)?)
    }

    async fn get_chat(&self, id: &ChatId) -> StoreResult<Option<Chat>> {
        let db = self.db.lock();
        queries::get_chat(db.connection(), id)
    }

    async fn set_chat(&self, id: &ChatId, chat: NewChat) -> StoreResult<Chat> {
        let chat = self.stamp(id.clone(), chat);
        self.store_chat(chat)
    }

    async fn add_chat(&self, chat: NewChat) -> StoreResult<Chat> {
        let chat = self.stamp(ChatId::generate(), chat);
        self.store_chat(chat)
    }

    async fn add_participant(
        &self,
        id: &ChatId,
        uid: &Uid,
        display_name: &str,
    ) -> StoreResult<Chat> {
        self.join_chat(id, uid, display_name)
    }

    async fn add_message(&self, chat_id: &ChatId, message: NewMessage) -> StoreResult<Message> {
        self.append_message(chat_id, message)
    }

    async fn update_chat_summary(&self, chat_id: &ChatId, last_message: &str) -> StoreResult<()> {
        self.touch_chat(chat_id, last_message)
    }

    async fn subscribe_chats(&self, uid: &Uid) -> StoreResult<Subscription<Vec<Chat>>> {
        let db = self.db.lock();
        let initial = queries::chats_for(db.connection(), uid)?;
        Ok(self.chat_lists.register(uid.clone(), initial))
    }

    async fn subscribe_messages(
        &self,
        chat_id: &ChatId,
    ) -> StoreResult<Subscription<Vec<Message>>> {
        let db = self.db.lock();
        let initial = queries::messages_for(db.connection(), chat_id)?;
        Ok(self.message_streams.register(chat_id.clone(), initial))
    }

    async fn poll_changes(&self) -> StoreResult<bool> {
        self.check_external_changes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(raw: &str) -> Uid {
        Uid::parse(raw).unwrap()
    }

    fn private_chat(a: &Uid, b: &Uid) -> NewChat {
        NewChat {
            kind: ChatKind::Private,
            participants: vec![a.clone(), b.clone()],
            participant_names: BTreeMap::from([
                (a.clone(), "Ann".to_string()),
                (b.clone(), "Bob".to_string()),
            ]),
            last_message: "hi".to_string(),
        }
    }

    fn group(owner: &Uid, name: &str) -> NewChat {
        NewChat {
            kind: ChatKind::Group {
                name: name.to_string(),
            },
            participants: vec![owner.clone()],
            participant_names: BTreeMap::from([(owner.clone(), "Ann".to_string())]),
            last_message: "Group Created".to_string(),
        }
    }

    fn say(sender: &Uid, text: &str) -> NewMessage {
        NewMessage {
            sender_id: sender.clone(),
            sender_name: "Ann".to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn users_merge_by_uid() {
        let store = SqliteStore::in_memory().unwrap();
        let ann = User {
            uid: uid("u1"),
            display_name: "Ann".to_string(),
        };
        store.upsert_user(&ann).await.unwrap();
        store
            .upsert_user(&User {
                display_name: "Annie".to_string(),
                ..ann.clone()
            })
            .await
            .unwrap();

        let loaded = store.get_user(&ann.uid).await.unwrap().unwrap();
        assert_eq!(loaded.display_name, "Annie");
        assert!(store.get_user(&uid("missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_chat_overwrites_and_keeps_messages() {
        let store = SqliteStore::in_memory().unwrap();
        let (a, b) = (uid("u1"), uid("u2"));
        let id = crate::identity::private_chat_id(&a, &b);

        store.set_chat(&id, private_chat(&a, &b)).await.unwrap();
        store.add_message(&id, say(&a, "first")).await.unwrap();
        store.set_chat(&id, private_chat(&b, &a)).await.unwrap();

        let chats = store.subscribe_chats(&a).await.unwrap().try_next().unwrap();
        assert_eq!(chats.len(), 1);
        let messages = store.subscribe_messages(&id).await.unwrap().try_next().unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn set_chat_rejects_invalid_private_id() {
        let store = SqliteStore::in_memory().unwrap();
        let (a, b) = (uid("u1"), uid("u2"));
        let err = store
            .set_chat(&ChatId::new("u2_u1"), private_chat(&a, &b))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidChat(_)));
    }

    #[tokio::test]
    async fn chat_list_is_newest_first_and_live() {
        let store = SqliteStore::in_memory().unwrap();
        let me = uid("u1");
        let first = store.add_chat(group(&me, "first")).await.unwrap();
        let second = store.add_chat(group(&me, "second")).await.unwrap();

        let mut chats = store.subscribe_chats(&me).await.unwrap();
        let initial = chats.next().await.unwrap();
        assert_eq!(
            initial.iter().map(|chat| &chat.id).collect::<Vec<_>>(),
            vec![&second.id, &first.id]
        );

        store.update_chat_summary(&first.id, "bump").await.unwrap();
        let updated = chats.next().await.unwrap();
        assert_eq!(updated[0].id, first.id);
        assert_eq!(updated[0].last_message, "bump");
    }

    #[tokio::test]
    async fn chat_list_only_contains_members_chats() {
        let store = SqliteStore::in_memory().unwrap();
        store.add_chat(group(&uid("u1"), "mine")).await.unwrap();
        store.add_chat(group(&uid("u2"), "theirs")).await.unwrap();

        let chats = store
            .subscribe_chats(&uid("u1"))
            .await
            .unwrap()
            .try_next()
            .unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].kind, ChatKind::Group { name: "mine".into() });
    }

    #[tokio::test]
    async fn messages_stream_in_server_time_order() {
        let store = SqliteStore::in_memory().unwrap();
        let me = uid("u1");
        let chat = store.add_chat(group(&me, "g")).await.unwrap();
        let mut stream = store.subscribe_messages(&chat.id).await.unwrap();
        assert_eq!(stream.next().await.unwrap(), vec![]);

        for text in ["one", "two", "three"] {
            store.add_message(&chat.id, say(&me, text)).await.unwrap();
        }
        let messages = stream.next().await.unwrap();
        let texts: Vec<_> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert!(messages.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn invalid_message_rows_are_skipped() {
        let store = SqliteStore::in_memory().unwrap();
        let me = uid("u1");
        let chat = store.add_chat(group(&me, "g")).await.unwrap();
        store.add_message(&chat.id, say(&me, "kept")).await.unwrap();
        {
            let db = store.db.lock();
            db.connection()
                .execute(
                    "INSERT INTO messages (id, chat_id, sender_id, sender_name, text, timestamp)
                     VALUES ('blank', ?1, 'u1', 'Ann', '   ', 1), ('bad', ?1, 'a_b', 'X', 'hi', 2)",
                    params![chat.id],
                )
                .unwrap();
        }

        let messages = store
            .subscribe_messages(&chat.id)
            .await
            .unwrap()
            .try_next()
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "kept");
    }

    #[tokio::test]
    async fn writes_to_unknown_chat_fail() {
        let store = SqliteStore::in_memory().unwrap();
        let missing = ChatId::new("nope");
        assert!(matches!(
            store.add_message(&missing, say(&uid("u1"), "x")).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.update_chat_summary(&missing, "x").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn add_participant_is_a_union() {
        let store = SqliteStore::in_memory().unwrap();
        let (owner, guest) = (uid("u1"), uid("u2"));
        let chat = store.add_chat(group(&owner, "g")).await.unwrap();

        let mut guest_chats = store.subscribe_chats(&guest).await.unwrap();
        assert!(guest_chats.next().await.unwrap().is_empty());

        store.add_participant(&chat.id, &guest, "Gus").await.unwrap();
        let joined = store.add_participant(&chat.id, &guest, "Gus").await.unwrap();
        assert_eq!(joined.participants, vec![owner, guest.clone()]);
        assert_eq!(joined.participant_names[&guest], "Gus");
        assert_eq!(guest_chats.next().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_subscription_is_unregistered() {
        let store = SqliteStore::in_memory().unwrap();
        let me = uid("u1");
        let chat = store.add_chat(group(&me, "g")).await.unwrap();
        let stream = store.subscribe_messages(&chat.id).await.unwrap();
        assert_eq!(store.listener_count(), 1);
        stream.cancel();
        assert_eq!(store.listener_count(), 0);
        store.add_message(&chat.id, say(&me, "after")).await.unwrap();
    }

    #[tokio::test]
    async fn poll_picks_up_other_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.db");
        let mine = SqliteStore::open(&path).unwrap();
        let theirs = SqliteStore::open(&path).unwrap();
        let me = uid("u1");
        mine.poll_changes().await.unwrap();

        let mut chats = mine.subscribe_chats(&me).await.unwrap();
        assert!(chats.next().await.unwrap().is_empty());
        assert!(!mine.poll_changes().await.unwrap());

        theirs.add_chat(group(&me, "elsewhere")).await.unwrap();
        assert!(mine.poll_changes().await.unwrap());
        assert_eq!(chats.next().await.unwrap().len(), 1);
    }
}
