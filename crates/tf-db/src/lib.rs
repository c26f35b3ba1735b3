//! Storage layer for the `TimeFlow` tracker.
//!
//! The engine works on a single [`TrackerState`] document. This crate
//! persists it in two places:
//!
//! - [`StateFile`]: the local JSON document.
//! - [`Database`]: a `SQLite` table holding one document per user name,
//!   standing in for the remote store that devices sync through.
//!
//! Both implement [`Storage`]. Loading is forgiving: [`load_or_default`]
//! falls back to an empty document when the stored one is missing or
//! unreadable.
//!
//! # Thread Safety
//!
//! [`Database`] wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Use one instance per thread or wrap it in a `Mutex`.
//!
//! # Schema
//!
//! ```sql
//! user_data(username TEXT PRIMARY KEY, state TEXT, updated_at TEXT)
//! ```
//!
//! `state` is the JSON document; `updated_at` is RFC 3339 UTC with
//! milliseconds, so lexicographic order matches chronological order.

mod file;

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

pub use file::StateFile;
use tf_core::TrackerState;

/// Storage errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Reading, writing or locking a file failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The stored document is not valid JSON for a tracker state.
    #[error("invalid state document: {0}")]
    Json(#[from] serde_json::Error),
    /// A stored timestamp could not be parsed.
    #[error("invalid timestamp for user {username}: {timestamp}")]
    TimestampParse {
        username: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Somewhere a tracker document can be loaded from and saved to.
pub trait Storage {
    /// Loads the document. Returns `None` if none has been saved yet.
    fn load(&self) -> Result<Option<TrackerState>, DbError>;

    fn save(&self, state: &TrackerState) -> Result<(), DbError>;
}

/// Loads a document, falling back to the empty default on any failure.
///
/// Corrupt or unreadable data is logged and replaced rather than fatal.
pub fn load_or_default(storage: &impl Storage) -> TrackerState {
    load_existing(storage).unwrap_or_default()
}

/// Loads a document if a readable one exists.
///
/// Unreadable data is logged and treated as missing.
pub fn load_existing(storage: &impl Storage) -> Option<TrackerState> {
    storage.load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "stored state unreadable, ignoring it");
        None
    })
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A stored document's owner and last write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub updated_at: DateTime<Utc>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| DbError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS user_data (
                username TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Loads a user's document. Returns `None` if the user has none.
    pub fn load_state(&self, username: &str) -> Result<Option<TrackerState>, DbError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT state FROM user_data WHERE username = ?",
                [username],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(DbError::from)
    }

    /// Stores a user's document, replacing any previous one.
    pub fn save_state(
        &self,
        username: &str,
        state: &TrackerState,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let json = serde_json::to_string(state)?;
        self.conn.execute(
            "
            INSERT INTO user_data (username, state, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(username) DO UPDATE SET
                state = excluded.state,
                updated_at = excluded.updated_at
            ",
            params![username, json, format_timestamp(now)],
        )?;
        tracing::debug!(username, "saved remote state document");
        Ok(())
    }

    /// Deletes a user's document. Returns whether one existed.
    pub fn delete_state(&self, username: &str) -> Result<bool, DbError> {
        let deleted = self
            .conn
            .execute("DELETE FROM user_data WHERE username = ?", [username])?;
        Ok(deleted > 0)
    }

    /// Lists stored documents, most recently written first.
    pub fn list_users(&self) -> Result<Vec<UserRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT username, updated_at
            FROM user_data
            ORDER BY updated_at DESC, username ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            let username: String = row.get(0)?;
            let updated_at: String = row.get(1)?;
            Ok((username, updated_at))
        })?;
        let mut users = Vec::new();
        for row in rows {
            let (username, timestamp) = row?;
            let updated_at = DateTime::parse_from_rfc3339(&timestamp)
                .map_err(|source| DbError::TimestampParse {
                    username: username.clone(),
                    timestamp: timestamp.clone(),
                    source,
                })?
                .with_timezone(&Utc);
            users.push(UserRecord {
                username,
                updated_at,
            });
        }
        Ok(users)
    }

    /// A [`Storage`] view of one user's document.
    pub const fn user<'a>(&'a self, username: &'a str) -> UserDocument<'a> {
        UserDocument { db: self, username }
    }
}

/// One user's document in a [`Database`].
pub struct UserDocument<'a> {
    db: &'a Database,
    username: &'a str,
}

impl Storage for UserDocument<'_> {
    fn load(&self) -> Result<Option<TrackerState>, DbError> {
        self.db.load_state(self.username)
    }

    fn save(&self, state: &TrackerState) -> Result<(), DbError> {
        self.db.save_state(self.username, state, Utc::now())
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
