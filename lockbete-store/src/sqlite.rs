//! SQLite-backed event store.
//!
//! Timestamps are stored as integer Unix milliseconds so range comparisons
//! in SQL are exact. Queries run synchronously under a mutex; tables are
//! small and the tailers poll on a multi-second cadence, so no connection
//! pool is warranted.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use tracing::debug;

use lockbete_core::cursor::SeqCursor;
use lockbete_core::events::{AuthAttempt, CommandEvent};

use crate::{EventStore, NewAuthAttempt, NewCommand, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS commands (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    ts         INTEGER NOT NULL,
    src_ip     TEXT NOT NULL,
    command    TEXT NOT NULL,
    failed     INTEGER
);
CREATE INDEX IF NOT EXISTS idx_commands_ts ON commands (ts, id);

CREATE TABLE IF NOT EXISTS auth_attempts (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    src_ip   TEXT NOT NULL,
    username TEXT NOT NULL,
    password TEXT NOT NULL,
    success  INTEGER NOT NULL,
    ts       INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_auth_attempts_ts ON auth_attempts (ts);
"#;

/// Event store backed by a local SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and ensures the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "opened event store");
        Self::with_connection(conn)
    }

    /// In-memory store, used by tests and the demo seeder.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn ts_from_millis(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::<Utc>::from_timestamp_millis(ms).ok_or(StoreError::InvalidTimestamp(ms))
}

// Raw row images: timestamp conversion is deferred so rusqlite's row
// mapping stays infallible.
struct RawCommand {
    id: i64,
    session_id: String,
    ts_ms: i64,
    src_ip: String,
    command: String,
    failed: Option<bool>,
}

impl RawCommand {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            session_id: row.get(1)?,
            ts_ms: row.get(2)?,
            src_ip: row.get(3)?,
            command: row.get(4)?,
            failed: row.get(5)?,
        })
    }

    fn into_event(self) -> Result<CommandEvent, StoreError> {
        Ok(CommandEvent {
            id: self.id,
            session_id: self.session_id,
            ts: ts_from_millis(self.ts_ms)?,
            src_ip: self.src_ip,
            command: self.command,
            failed: self.failed,
        })
    }
}

struct RawAuth {
    id: i64,
    src_ip: String,
    username: String,
    password: String,
    success: bool,
    ts_ms: i64,
}

impl RawAuth {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            src_ip: row.get(1)?,
            username: row.get(2)?,
            password: row.get(3)?,
            success: row.get(4)?,
            ts_ms: row.get(5)?,
        })
    }

    fn into_event(self) -> Result<AuthAttempt, StoreError> {
        Ok(AuthAttempt {
            id: self.id,
            src_ip: self.src_ip,
            username: self.username,
            password: self.password,
            success: self.success,
            ts: ts_from_millis(self.ts_ms)?,
        })
    }
}

fn collect_commands(raw: Vec<rusqlite::Result<RawCommand>>) -> Result<Vec<CommandEvent>, StoreError> {
    raw.into_iter()
        .map(|r| r.map_err(StoreError::from).and_then(RawCommand::into_event))
        .collect()
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn auth_attempts_after(&self, last_id: i64) -> Result<Vec<AuthAttempt>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, src_ip, username, password, success, ts
             FROM auth_attempts WHERE id > ?1 ORDER BY ts ASC, id ASC",
        )?;
        let raw: Vec<_> = stmt
            .query_map(params![last_id], RawAuth::from_row)?
            .collect();
        raw.into_iter()
            .map(|r| r.map_err(StoreError::from).and_then(RawAuth::into_event))
            .collect()
    }

    async fn recent_commands(&self, limit: u32) -> Result<Vec<CommandEvent>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, ts, src_ip, command, failed
             FROM commands ORDER BY ts DESC, id DESC LIMIT ?1",
        )?;
        let raw: Vec<_> = stmt
            .query_map(params![limit], RawCommand::from_row)?
            .collect();
        collect_commands(raw)
    }

    async fn commands_after(&self, cursor: SeqCursor) -> Result<Vec<CommandEvent>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, ts, src_ip, command, failed
             FROM commands
             WHERE ts > ?1 OR (ts = ?1 AND id > ?2)
             ORDER BY ts ASC, id ASC",
        )?;
        let raw: Vec<_> = stmt
            .query_map(params![cursor.ts_ms, cursor.id], RawCommand::from_row)?
            .collect();
        collect_commands(raw)
    }

    async fn commands_in_window(
        &self,
        lo: DateTime<Utc>,
        hi: DateTime<Utc>,
    ) -> Result<Vec<CommandEvent>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, ts, src_ip, command, failed
             FROM commands
             WHERE ts >= ?1 AND ts < ?2
             ORDER BY ts ASC, id ASC",
        )?;
        let raw: Vec<_> = stmt
            .query_map(
                params![lo.timestamp_millis(), hi.timestamp_millis()],
                RawCommand::from_row,
            )?
            .collect();
        collect_commands(raw)
    }

    async fn earliest_command_ts(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let conn = self.conn.lock();
        let min: Option<i64> =
            conn.query_row("SELECT MIN(ts) FROM commands", [], |row| row.get(0))?;
        min.map(ts_from_millis).transpose()
    }

    async fn commands_desc(&self, limit: Option<u32>) -> Result<Vec<CommandEvent>, StoreError> {
        let conn = self.conn.lock();
        let raw: Vec<_> = match limit {
            Some(n) => {
                let mut stmt = conn.prepare(
                    "SELECT id, session_id, ts, src_ip, command, failed
                     FROM commands ORDER BY ts DESC, id DESC LIMIT ?1",
                )?;
                let rows: Vec<_> = stmt.query_map(params![n], RawCommand::from_row)?.collect();
                rows
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, session_id, ts, src_ip, command, failed
                     FROM commands ORDER BY ts DESC, id DESC",
                )?;
                let rows: Vec<_> = stmt.query_map([], RawCommand::from_row)?.collect();
                rows
            }
        };
        collect_commands(raw)
    }

    async fn insert_command(&self, cmd: NewCommand) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO commands (session_id, ts, src_ip, command, failed)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                cmd.session_id,
                cmd.ts.timestamp_millis(),
                cmd.src_ip,
                cmd.command,
                cmd.failed,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn insert_auth_attempt(&self, attempt: NewAuthAttempt) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO auth_attempts (src_ip, username, password, success, ts)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                attempt.src_ip,
                attempt.username,
                attempt.password,
                attempt.success,
                attempt.ts.timestamp_millis(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}
