// SQLite persistence shared by the player and team stores.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::debug;

use crate::error::Result;

/// SQLite-backed storage for players and teams.
///
/// A single connection sits behind a mutex: every read and every write
/// transaction holds the lock for its whole duration, so writers are
/// serialized and readers never see a half-applied change.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS teams (
                id     INTEGER PRIMARY KEY AUTOINCREMENT,
                name   TEXT NOT NULL UNIQUE CHECK (length(trim(name)) > 0),
                budget INTEGER NOT NULL CHECK (budget > 0)
            );

            CREATE TABLE IF NOT EXISTS players (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                name             TEXT NOT NULL,
                position         TEXT NOT NULL,
                team             TEXT NOT NULL,
                projected_points REAL CHECK (projected_points IS NULL OR projected_points >= 0),
                drafted          INTEGER NOT NULL DEFAULT 0,
                draft_price      INTEGER CHECK (draft_price IS NULL OR draft_price >= 0),
                drafted_by       INTEGER REFERENCES teams(id),
                drafted_at       TEXT,
                CHECK (
                    (drafted = 0 AND draft_price IS NULL AND drafted_by IS NULL AND drafted_at IS NULL)
                    OR (drafted = 1 AND draft_price IS NOT NULL AND drafted_by IS NOT NULL)
                )
            );

            CREATE INDEX IF NOT EXISTS idx_players_drafted_by ON players(drafted_by);
            ",
        )?;

        debug!("Database schema ready at {}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// A panic while the lock was held leaves at worst an uncommitted
    /// transaction, which SQLite rolls back when it is dropped, so a poisoned
    /// lock still guards a usable connection.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` against the connection while holding the lock.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn();
        f(&conn)
    }

    /// Run `f` inside an immediate write transaction. The transaction commits
    /// when `f` returns `Ok` and rolls back on any error.
    pub fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}
