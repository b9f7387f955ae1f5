//! Shared game state: called numbers, prize kinds, claim lifecycle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ticket::MAX_NUMBER;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("number {0} is outside 1-90")]
    OutOfRange(u8),
    #[error("number {0} has already been called")]
    AlreadyCalled(u8),
    #[error("all 90 numbers have been called")]
    Exhausted,
}

/// Numbers called so far in a game, in call order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct CalledNumbers {
    order: Vec<u8>,
}

impl CalledNumbers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sequence(numbers: impl IntoIterator<Item = u8>) -> Result<Self, CallError> {
        let mut called = Self::new();
        for number in numbers {
            called.push(number)?;
        }
        Ok(called)
    }

    /// Check that `number` may be called next without recording it.
    pub fn check(&self, number: u8) -> Result<(), CallError> {
        if number == 0 || number > MAX_NUMBER {
            return Err(CallError::OutOfRange(number));
        }
        if self.contains(number) {
            return Err(CallError::AlreadyCalled(number));
        }
        Ok(())
    }

    pub fn push(&mut self, number: u8) -> Result<(), CallError> {
        self.check(number)?;
        self.order.push(number);
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, number: u8) -> bool {
        self.order.contains(&number)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.order.len() == MAX_NUMBER as usize
    }

    #[must_use]
    pub fn last(&self) -> Option<u8> {
        self.order.last().copied()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.order
    }

    /// Numbers not yet called, ascending.
    #[must_use]
    pub fn uncalled(&self) -> Vec<u8> {
        (1..=MAX_NUMBER).filter(|n| !self.contains(*n)).collect()
    }
}

impl TryFrom<Vec<u8>> for CalledNumbers {
    type Error = CallError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_sequence(value)
    }
}

impl From<CalledNumbers> for Vec<u8> {
    fn from(value: CalledNumbers) -> Self {
        value.order
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown prize '{0}'; expected one of: early-five, top-line, middle-line, bottom-line, four-corners, full-house")]
pub struct PrizeParseError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrizeKind {
    EarlyFive,
    TopLine,
    MiddleLine,
    BottomLine,
    FourCorners,
    FullHouse,
}

impl PrizeKind {
    pub const ALL: [PrizeKind; 6] = [
        PrizeKind::EarlyFive,
        PrizeKind::TopLine,
        PrizeKind::MiddleLine,
        PrizeKind::BottomLine,
        PrizeKind::FourCorners,
        PrizeKind::FullHouse,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PrizeKind::EarlyFive => "early-five",
            PrizeKind::TopLine => "top-line",
            PrizeKind::MiddleLine => "middle-line",
            PrizeKind::BottomLine => "bottom-line",
            PrizeKind::FourCorners => "four-corners",
            PrizeKind::FullHouse => "full-house",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            PrizeKind::EarlyFive => "Early Five",
            PrizeKind::TopLine => "Top Line",
            PrizeKind::MiddleLine => "Middle Line",
            PrizeKind::BottomLine => "Bottom Line",
            PrizeKind::FourCorners => "Four Corners",
            PrizeKind::FullHouse => "Full House",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, PrizeParseError> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| PrizeParseError(raw.trim().to_string()))
    }
}

impl FromStr for PrizeKind {
    type Err = PrizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PrizeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown claim status '{0}'")]
pub struct ClaimStatusParseError(pub String);

/// Lifecycle of a prize claim: `Pending` until an admin decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Rejected,
}

impl ClaimStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ClaimStatusParseError> {
        match raw {
            "pending" => Ok(ClaimStatus::Pending),
            "approved" => Ok(ClaimStatus::Approved),
            "rejected" => Ok(ClaimStatus::Rejected),
            other => Err(ClaimStatusParseError(other.to_string())),
        }
    }

    /// Only pending claims can be decided; decisions are final.
    #[must_use]
    pub const fn can_become(self, next: ClaimStatus) -> bool {
        matches!(
            (self, next),
            (ClaimStatus::Pending, ClaimStatus::Approved | ClaimStatus::Rejected)
        )
    }

    /// Open claims block the same player from filing the prize again.
    #[must_use]
    pub const fn is_open(self) -> bool {
        !matches!(self, ClaimStatus::Rejected)
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
