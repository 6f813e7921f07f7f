//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The pipeline calls store methods; it never executes SQL directly.
//!
//! Everything one submission writes goes through a single `StoreTx`.
//! Dropping a `StoreTx` without `commit()` rolls all of it back.

mod catalog;
mod complaint;
mod customer;
mod insight;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::{StoreError, StoreResult};

pub struct ComplaintStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl ComplaintStore {
    pub fn open(path: &str) -> StoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Open another connection to the same database, one per worker.
    /// For in-memory databases this returns a new, isolated database.
    pub fn reopen(&self) -> StoreResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> StoreResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_catalog.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_complaints.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_insights.sql"))?;
        Ok(())
    }

    /// Start the write unit for one submission.
    ///
    /// Taken IMMEDIATE so the phone lookup and the writes that follow it
    /// see the same database state when several workers share a file.
    pub fn begin(&mut self) -> StoreResult<StoreTx<'_>> {
        Ok(StoreTx {
            tx: self
                .conn
                .transaction_with_behavior(TransactionBehavior::Immediate)?,
        })
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> StoreResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

pub struct StoreTx<'conn> {
    tx: Transaction<'conn>,
}

impl StoreTx<'_> {
    pub fn commit(self) -> StoreResult<()> {
        self.tx.commit()?;
        Ok(())
    }
}

// ── Column codecs ──────────────────────────────────────────────────

pub(crate) fn encode_ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub(crate) fn decode_ts(column: &'static str, value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::InvalidRow {
            column,
            value: value.to_string(),
        })
}
