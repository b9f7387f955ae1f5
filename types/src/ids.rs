use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(i64);

impl PlayerId {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(i64);

impl ClaimId {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(self) -> i64 {
        self.0
    }
}

impl FromStr for ClaimId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("device id must not be empty")]
    EmptyDevice,
    #[error("ticket code must look like TMB-XXXXXXXX (got {0})")]
    TicketCode(String),
}

/// Opaque identifier for the device (browser session, phone) a player
/// registered from. One ticket per device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Fresh random device id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn parse(raw: &str) -> Result<Self, IdParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdParseError::EmptyDevice);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Short human-readable recovery code printed on a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketCode(String);

impl TicketCode {
    const PREFIX: &'static str = "TMB-";
    const SUFFIX_LEN: usize = 8;

    /// Fresh code: `TMB-` followed by 8 uppercase hex characters.
    #[must_use]
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
        Self(format!("{}{}", Self::PREFIX, &simple[..Self::SUFFIX_LEN]))
    }

    /// Parse a code typed by a user. Case-insensitive.
    pub fn parse(raw: &str) -> Result<Self, IdParseError> {
        let upper = raw.trim().to_ascii_uppercase();
        let valid = upper.strip_prefix(Self::PREFIX).is_some_and(|suffix| {
            suffix.len() == Self::SUFFIX_LEN && suffix.bytes().all(|b| b.is_ascii_hexdigit())
        });
        if valid {
            Ok(Self(upper))
        } else {
            Err(IdParseError::TicketCode(raw.trim().to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
