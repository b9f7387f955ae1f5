use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::ticket::Ticket;

/// Canonical content key for a [`Ticket`].
///
/// SHA-256 over the 27 row-major cell bytes, lowercase hex. Position is part
/// of the encoding, so moving a number to a different cell changes the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fingerprint must be 64 lowercase hex characters (got {0:?})")]
pub struct FingerprintParseError(pub String);

impl Fingerprint {
    pub const HEX_LEN: usize = 64;

    #[must_use]
    pub fn of(ticket: &Ticket) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(ticket.cells());
        let hash = hasher.finalize();
        Self(hash.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Accept a previously stored fingerprint.
    #[must_use]
    pub fn from_hex(value: &str) -> Option<Self> {
        let valid = value.len() == Self::HEX_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(value.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 hex characters, for logs.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = FingerprintParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value).ok_or(FingerprintParseError(value))
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
