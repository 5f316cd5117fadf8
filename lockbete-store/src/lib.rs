//! # lockbete-store
//!
//! Access layer for the honeypot event store. The store is append-only:
//! rows are inserted by the sensor pipeline and never updated or deleted,
//! which is the precondition for cursor-based tailing.
//!
//! The [`EventStore`] trait carries exactly the query shapes the tailers
//! need; [`SqliteStore`] is the shipped implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use lockbete_core::cursor::SeqCursor;
use lockbete_core::events::{AuthAttempt, CommandEvent};

mod sqlite;

pub use sqlite::SqliteStore;

/// Store access error conditions.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("stored timestamp out of range: {0}")]
    InvalidTimestamp(i64),
}

/// A command row as written by the sensor, before the store assigns an id.
#[derive(Clone, Debug)]
pub struct NewCommand {
    pub session_id: String,
    pub ts: DateTime<Utc>,
    pub src_ip: String,
    pub command: String,
    pub failed: Option<bool>,
}

/// An auth attempt as written by the sensor, before the store assigns an id.
#[derive(Clone, Debug)]
pub struct NewAuthAttempt {
    pub src_ip: String,
    pub username: String,
    pub password: String,
    pub success: bool,
    pub ts: DateTime<Utc>,
}

/// Queries over the append-only honeypot event tables.
///
/// Implementations must preserve two ordering contracts: `id` on
/// `auth_attempts` is assigned monotonically in insertion order, and all
/// ascending fetches order by `(ts, id)` so composite cursors are exact.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Auth attempts with `id` strictly greater than `last_id`, ascending
    /// by timestamp.
    async fn auth_attempts_after(&self, last_id: i64) -> Result<Vec<AuthAttempt>, StoreError>;

    /// The `limit` most recent command rows, newest first. Callers that
    /// need oldest-first delivery reverse the batch themselves.
    async fn recent_commands(&self, limit: u32) -> Result<Vec<CommandEvent>, StoreError>;

    /// Command rows strictly past `cursor` in `(ts, id)` order, ascending.
    async fn commands_after(&self, cursor: SeqCursor) -> Result<Vec<CommandEvent>, StoreError>;

    /// Command rows with `lo <= ts < hi`, ascending.
    async fn commands_in_window(
        &self,
        lo: DateTime<Utc>,
        hi: DateTime<Utc>,
    ) -> Result<Vec<CommandEvent>, StoreError>;

    /// Earliest command timestamp, or `None` on an empty table. Replay
    /// anchors here.
    async fn earliest_command_ts(&self) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Full command table newest first, optionally capped.
    async fn commands_desc(&self, limit: Option<u32>) -> Result<Vec<CommandEvent>, StoreError>;

    /// Appends a command row, returning its assigned id.
    async fn insert_command(&self, cmd: NewCommand) -> Result<i64, StoreError>;

    /// Appends an auth attempt, returning its assigned id.
    async fn insert_auth_attempt(&self, attempt: NewAuthAttempt) -> Result<i64, StoreError>;
}
