//! Player registration records.

use anyhow::Context;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use serde::Serialize;
use tracing::info;

use tambola_core::IssuedTicket;
use tambola_types::{DeviceId, Fingerprint, PlayerId, PlayerName, Ticket, TicketCode};

use crate::{GameStore, Result, StoreError, now_iso8601};

/// A registered player and the ticket issued to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: PlayerName,
    pub device_id: DeviceId,
    pub ticket_code: TicketCode,
    pub ticket: Ticket,
    pub fingerprint: Fingerprint,
    /// `false` if the ticket was issued after uniqueness attempts ran out.
    pub unique_ticket: bool,
    pub created_at: String,
}

/// Outcome of a registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Created(Player),
    /// The device already had a ticket; nothing new was issued.
    Existing(Player),
}

impl Registration {
    #[must_use]
    pub fn player(&self) -> &Player {
        match self {
            Registration::Created(player) | Registration::Existing(player) => player,
        }
    }

    #[must_use]
    pub fn into_player(self) -> Player {
        match self {
            Registration::Created(player) | Registration::Existing(player) => player,
        }
    }

    #[must_use]
    pub fn is_new(&self) -> bool {
        matches!(self, Registration::Created(_))
    }
}

/// Columns in the order `map_player` expects.
const PLAYER_COLUMNS: &str =
    "id, name, device_id, ticket_code, ticket_data, fingerprint, unique_ticket, created_at";

/// Attempts at finding an unused ticket code before giving up.
const CODE_ATTEMPTS: usize = 5;

struct PlayerRow {
    id: i64,
    name: String,
    device_id: String,
    ticket_code: String,
    ticket_data: String,
    fingerprint: String,
    unique_ticket: bool,
    created_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<PlayerRow> {
    Ok(PlayerRow {
        id: row.get(0)?,
        name: row.get(1)?,
        device_id: row.get(2)?,
        ticket_code: row.get(3)?,
        ticket_data: row.get(4)?,
        fingerprint: row.get(5)?,
        unique_ticket: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl PlayerRow {
    fn into_player(self) -> Result<Player> {
        let id = self.id;
        let corrupt = |reason: String| StoreError::Corrupt {
            table: "players",
            id,
            reason,
        };

        let ticket: Ticket =
            serde_json::from_str(&self.ticket_data).map_err(|e| corrupt(e.to_string()))?;
        let name = PlayerName::new(&self.name).map_err(|e| corrupt(e.to_string()))?;
        let device_id = DeviceId::parse(&self.device_id).map_err(|e| corrupt(e.to_string()))?;
        let ticket_code =
            TicketCode::parse(&self.ticket_code).map_err(|e| corrupt(e.to_string()))?;
        let fingerprint = Fingerprint::from_hex(&self.fingerprint)
            .ok_or_else(|| corrupt(format!("bad fingerprint {}", self.fingerprint)))?;

        Ok(Player {
            id: PlayerId::new(self.id),
            name,
            device_id,
            ticket_code,
            ticket,
            fingerprint,
            unique_ticket: self.unique_ticket,
            created_at: self.created_at,
        })
    }
}

fn is_unique_violation(err: &rusqlite::Error, column: &str) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, Some(message)) => {
            failure.code == ErrorCode::ConstraintViolation && message.contains(column)
        }
        _ => false,
    }
}

pub(crate) fn find_by_device(db: &Connection, device_id: &DeviceId) -> Result<Option<Player>> {
    let sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE device_id = ?1");
    let row = db
        .query_row(&sql, params![device_id.as_str()], read_row)
        .optional()
        .context("Failed to look up player by device")?;
    row.map(PlayerRow::into_player).transpose()
}

impl GameStore {
    /// Store a newly issued ticket for `device_id`.
    ///
    /// If the device already has a player (including one inserted by a
    /// concurrent request), that player is returned as
    /// [`Registration::Existing`] and `issued` is discarded.
    pub fn insert_player(
        &self,
        device_id: &DeviceId,
        name: &PlayerName,
        issued: &IssuedTicket,
    ) -> Result<Registration> {
        let ticket_data = serde_json::to_string(issued.ticket())
            .context("Failed to serialize ticket")?;
        let db = self.conn();

        for _ in 0..CODE_ATTEMPTS {
            let code = TicketCode::generate();
            let inserted = db.execute(
                "INSERT INTO players
                    (name, device_id, ticket_code, ticket_data, fingerprint, unique_ticket, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    name.as_str(),
                    device_id.as_str(),
                    code.as_str(),
                    &ticket_data,
                    issued.fingerprint().as_str(),
                    issued.is_unique(),
                    now_iso8601(),
                ],
            );

            match inserted {
                Ok(_) => {
                    let player = find_by_device(&db, device_id)?
                        .ok_or_else(|| StoreError::UnknownPlayer(device_id.to_string()))?;
                    info!(
                        player = %player.id,
                        code = %player.ticket_code,
                        unique = player.unique_ticket,
                        "Registered player"
                    );
                    return Ok(Registration::Created(player));
                }
                Err(err) if is_unique_violation(&err, "players.device_id") => {
                    let player = find_by_device(&db, device_id)?
                        .ok_or_else(|| StoreError::UnknownPlayer(device_id.to_string()))?;
                    return Ok(Registration::Existing(player));
                }
                Err(err) if is_unique_violation(&err, "players.ticket_code") => {}
                Err(err) => {
                    return Err(anyhow::Error::new(err)
                        .context("Failed to insert player")
                        .into());
                }
            }
        }

        Err(anyhow::anyhow!("Could not allocate an unused ticket code").into())
    }

    pub fn player_by_device(&self, device_id: &DeviceId) -> Result<Option<Player>> {
        find_by_device(&self.conn(), device_id)
    }

    /// Look up a player by the recovery code printed on their ticket.
    pub fn player_by_code(&self, code: &TicketCode) -> Result<Option<Player>> {
        let sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE ticket_code = ?1");
        let row = self
            .conn()
            .query_row(&sql, params![code.as_str()], read_row)
            .optional()
            .context("Failed to look up player by ticket code")?;
        row.map(PlayerRow::into_player).transpose()
    }

    /// All players, newest first.
    pub fn list_players(&self) -> Result<Vec<Player>> {
        let db = self.conn();
        let sql = format!("SELECT {PLAYER_COLUMNS} FROM players ORDER BY created_at DESC, id DESC");
        let mut stmt = db
            .prepare(&sql)
            .context("Failed to prepare list_players query")?;
        let rows = stmt
            .query_map([], read_row)
            .context("Failed to query players")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read player row")?;
        rows.into_iter().map(PlayerRow::into_player).collect()
    }

    pub fn player_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))
            .context("Failed to count players")?;
        Ok(count as usize)
    }

    /// Remove a player and their claims. The ticket's fingerprint stays
    /// registered. Returns `false` if no such player existed.
    pub fn delete_player(&self, id: PlayerId) -> Result<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM players WHERE id = ?1", params![id.value()])
            .context("Failed to delete player")?;
        Ok(deleted == 1)
    }
}
