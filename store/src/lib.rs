//! SQLite persistence for a Tambola game.
//!
//! One database file holds everything the game needs to survive a restart:
//!
//! ```text
//! GameStore (Mutex<Connection>)
//! ├── players         one row per device, ticket stored as JSON cells
//! ├── used_tickets    issued fingerprints (FingerprintStore backend)
//! ├── called_numbers  call order for the current game
//! └── prizes          claims and their approval status
//! ```
//!
//! [`TicketDesk`] combines the store with a [`tambola_core::Registry`] to
//! register players with unique tickets.

mod desk;
mod export;
mod fs_security;
mod game;
mod players;

pub use desk::TicketDesk;
pub use export::Snapshot;
pub use game::Claim;
pub use players::{Player, Registration};

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, params};
use thiserror::Error;
use tracing::debug;

use tambola_core::{ClaimError, FingerprintStore, RegistryError};
use tambola_types::{CallError, Fingerprint};

use crate::fs_security::prepare_game_db;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] anyhow::Error),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Claim(#[from] ClaimError),
    #[error(transparent)]
    Call(#[from] CallError),
    #[error("no player registered for {0}")]
    UnknownPlayer(String),
    #[error("stored {table} row {id} is corrupt: {reason}")]
    Corrupt {
        table: &'static str,
        id: i64,
        reason: String,
    },
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Persistent store for players, issued fingerprints, and game state.
pub struct GameStore {
    db: Mutex<Connection>,
}

impl GameStore {
    const SCHEMA: &'static str = r"
        CREATE TABLE IF NOT EXISTS players (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            device_id TEXT UNIQUE NOT NULL,
            ticket_code TEXT UNIQUE NOT NULL,
            ticket_data TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            unique_ticket INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS used_tickets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ticket_hash TEXT UNIQUE NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS called_numbers (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            number INTEGER UNIQUE NOT NULL CHECK (number BETWEEN 1 AND 90),
            called_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS prizes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_id INTEGER NOT NULL,
            ticket_code TEXT NOT NULL,
            prize_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            verified INTEGER NOT NULL,
            claimed_at TEXT NOT NULL,
            decided_at TEXT,
            FOREIGN KEY (player_id) REFERENCES players(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_prizes_type_status
        ON prizes(prize_type, status);

        CREATE INDEX IF NOT EXISTS idx_prizes_player
        ON prizes(player_id);
    ";

    /// Open or create the game database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        prepare_game_db(path)?;

        let db = Connection::open(path)
            .with_context(|| format!("Failed to open game store at {}", path.display()))?;
        debug!(path = %path.display(), "Opened game store");
        Self::initialize(db)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory game store")?;
        Self::initialize(db)
    }

    fn initialize(db: Connection) -> Result<Self> {
        db.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL; PRAGMA foreign_keys=ON; \
             PRAGMA busy_timeout=5000;",
        )
        .context("Failed to set game store pragmas")?;
        db.execute_batch(Self::SCHEMA)
            .context("Failed to create game store schema")?;
        Ok(Self { db: Mutex::new(db) })
    }

    /// Serialized access to the connection. A panic inside a transaction
    /// rolls it back on drop, so a poisoned lock is still consistent.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of fingerprints ever issued.
    pub fn fingerprint_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM used_tickets", [], |row| row.get(0))
            .context("Failed to count used tickets")?;
        Ok(count as usize)
    }
}

impl FingerprintStore for GameStore {
    fn insert_if_absent(&self, fingerprint: &Fingerprint) -> Result<bool, RegistryError> {
        // The UNIQUE constraint makes this a single atomic check-and-insert,
        // even across processes sharing the file.
        let inserted = self
            .conn()
            .execute(
                "INSERT OR IGNORE INTO used_tickets (ticket_hash, created_at) VALUES (?1, ?2)",
                params![fingerprint.as_str(), now_iso8601()],
            )
            .map_err(|err| RegistryError::store("Failed to record fingerprint", err))?;
        Ok(inserted == 1)
    }

    fn contains(&self, fingerprint: &Fingerprint) -> Result<bool, RegistryError> {
        self.conn()
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM used_tickets WHERE ticket_hash = ?1)",
                params![fingerprint.as_str()],
                |row| row.get(0),
            )
            .map_err(|err| RegistryError::store("Failed to look up fingerprint", err))
    }

    fn len(&self) -> Result<usize, RegistryError> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM used_tickets", [], |row| row.get(0))
            .map_err(|err| RegistryError::store("Failed to count fingerprints", err))?;
        Ok(count as usize)
    }
}

/// Current UTC time as ISO 8601 with millisecond precision.
pub(crate) fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
