//! Core domain types for Tambola.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod fingerprint;
mod game;
mod ids;
mod ticket;

pub use fingerprint::{Fingerprint, FingerprintParseError};
pub use game::{
    CallError, CalledNumbers, ClaimStatus, ClaimStatusParseError, PrizeKind, PrizeParseError,
};
pub use ids::{ClaimId, DeviceId, IdParseError, PlayerId, TicketCode};
pub use ticket::{
    CELLS, COLUMNS, ColumnRange, Grid, MAX_NUMBER, MAX_PER_COLUMN, NUMBERS_PER_ROW,
    NUMBERS_PER_TICKET, ROWS, Ticket, TicketError, validate,
};

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Player Name
// ============================================================================

/// Longest name accepted at registration, in characters.
pub const MAX_NAME_CHARS: usize = 64;

/// A trimmed, non-empty display name for a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerName(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerNameError {
    #[error("player name must not be empty")]
    Empty,
    #[error("player name must be at most {max} characters")]
    TooLong { max: usize },
}

impl PlayerName {
    pub fn new(value: impl AsRef<str>) -> Result<Self, PlayerNameError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(PlayerNameError::Empty);
        }
        if trimmed.chars().count() > MAX_NAME_CHARS {
            return Err(PlayerNameError::TooLong {
                max: MAX_NAME_CHARS,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for PlayerName {
    type Error = PlayerNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for PlayerName {
    type Error = PlayerNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlayerName> for String {
    fn from(value: PlayerName) -> Self {
        value.0
    }
}

impl Deref for PlayerName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_name_trims() {
        let name = PlayerName::new("  Asha  ").unwrap();
        assert_eq!(name.as_str(), "Asha");
    }

    #[test]
    fn player_name_rejects_blank() {
        assert_eq!(PlayerName::new(""), Err(PlayerNameError::Empty));
        assert_eq!(PlayerName::new(" \n\t"), Err(PlayerNameError::Empty));
    }

    #[test]
    fn player_name_rejects_long() {
        let long = "x".repeat(MAX_NAME_CHARS + 1);
        assert_eq!(
            PlayerName::new(long),
            Err(PlayerNameError::TooLong {
                max: MAX_NAME_CHARS
            })
        );
    }
}
