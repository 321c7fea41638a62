//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database. Services call store
//! methods — they never execute SQL directly.

use crate::{
    error::DeskResult,
    event::EventLogEntry,
};
use rusqlite::{params, Connection, Transaction};

mod appointment;
mod client;
mod comment;
mod cosigner;
mod record;

pub struct DeskStore {
    conn: Connection,
}

impl DeskStore {
    /// Open (or create) the desk database at `path`.
    pub fn open(path: &str) -> DeskResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance on real files.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> DeskResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> DeskResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/002_clients.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/003_records.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/004_appointments.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/005_cosigners.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/006_comments.sql"))?;
        Ok(())
    }

    /// Begin a transaction on this connection. Store calls made while
    /// it is open participate in it; the gate-then-insert flows rely
    /// on this.
    pub fn begin(&self) -> DeskResult<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (occurred_at, actor_id, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.occurred_at,
                entry.actor_id,
                entry.event_type,
                entry.payload
            ],
        )?;
        Ok(())
    }

    pub fn events_by_type(&self, event_type: &str) -> DeskResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, occurred_at, actor_id, event_type, payload
             FROM event_log WHERE event_type = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![event_type], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    occurred_at: row.get(1)?,
                    actor_id: row.get(2)?,
                    event_type: row.get(3)?,
                    payload: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, event_type: &str) -> DeskResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM event_log WHERE event_type = ?1",
                params![event_type],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}

/// Wrap a column decode failure (bad JSON, bad date, unknown status)
/// so row mappers can stay inside rusqlite's error type.
pub(crate) fn bad_column(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

pub(crate) fn bad_value(idx: usize, msg: String) -> rusqlite::Error {
    bad_column(idx, std::io::Error::new(std::io::ErrorKind::InvalidData, msg))
}
