//! Anonymous authentication.
//!
//! `LocalAuth` keeps one signed-in identity per session database, the way a
//! hosted auth SDK keeps one per browser profile.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{OptionalExtension, params};
use thiserror::Error;
use tokio::sync::watch;

use crate::common::Uid;
use crate::storage::{Database, StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: Uid,
    pub display_name: Option<String>,
}

impl AuthUser {
    pub fn display_name_or_default(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Anonymous")
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no user is signed in")]
    NotSignedIn,
    #[error("session storage failed: {0}")]
    Store(#[from] StoreError),
}

impl From<rusqlite::Error> for AuthError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store(StoreError::from(err))
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Signs in without credentials. Returns the existing user if a session
    /// is already active.
    async fn sign_in_anonymously(&self) -> AuthResult<AuthUser>;

    async fn update_profile(&self, display_name: &str) -> AuthResult<AuthUser>;

    async fn sign_out(&self) -> AuthResult<()>;

    fn current_user(&self) -> Option<AuthUser>;

    /// Auth-state notifications. The current value is the restored session.
    fn watch(&self) -> watch::Receiver<Option<AuthUser>>;
}

pub struct LocalAuth {
    db: Mutex<Database>,
    state: watch::Sender<Option<AuthUser>>,
}

impl LocalAuth {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::with_database(Database::new(path)?)
    }

    pub fn in_memory() -> StoreResult<Self> {
        Self::with_database(Database::in_memory()?)
    }

    pub fn with_database(db: Database) -> StoreResult<Self> {
        db.connection().execute(
            "CREATE TABLE IF NOT EXISTS session (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                uid TEXT NOT NULL,
                display_name TEXT,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        let restored = db
            .connection()
            .query_row(
                "SELECT uid, display_name FROM session WHERE id = 1",
                [],
                |row| {
                    Ok(AuthUser {
                        uid: row.get(0)?,
                        display_name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        if let Some(user) = &restored {
            log::info!("Restored session for {}", user.uid);
        }

        let (state, _) = watch::channel(restored);
        Ok(Self {
            db: Mutex::new(db),
            state,
        })
    }

    fn save(&self, user: &AuthUser) -> AuthResult<()> {
        let db = self.db.lock();
        db.connection().execute(
            "INSERT INTO session (id, uid, display_name, created_at) VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE
             SET uid = excluded.uid, display_name = excluded.display_name",
            params![user.uid, user.display_name, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn clear(&self) -> AuthResult<()> {
        let db = self.db.lock();
        db.connection()
            .execute("DELETE FROM session WHERE id = 1", [])?;
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for LocalAuth {
    async fn sign_in_anonymously(&self) -> AuthResult<AuthUser> {
        if let Some(user) = self.current_user() {
            return Ok(user);
        }
        let user = AuthUser {
            uid: Uid::generate(),
            display_name: None,
        };
        self.save(&user)?;
        log::info!("Signed in anonymously as {}", user.uid);
        self.state.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn update_profile(&self, display_name: &str) -> AuthResult<AuthUser> {
        let mut user = self.current_user().ok_or(AuthError::NotSignedIn)?;
        user.display_name = Some(display_name.to_string());
        self.save(&user)?;
        self.state.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.clear()?;
        log::info!("Signed out");
        self.state.send_replace(None);
        Ok(())
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.state.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<AuthUser>> {
        self.state.subscribe()
    }
}
