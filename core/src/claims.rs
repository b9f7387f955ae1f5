//! Prize patterns and claim rules.

use thiserror::Error;

use tambola_types::{CalledNumbers, ClaimId, ClaimStatus, NUMBERS_PER_ROW, PrizeKind, Ticket};

/// Numbers that must be marked for Early Five.
pub const EARLY_FIVE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    #[error("{kind} is not complete: {marked} of {needed} numbers called")]
    NotComplete {
        kind: PrizeKind,
        marked: usize,
        needed: usize,
    },
    #[error("player already has an open {0} claim")]
    DuplicateClaim(PrizeKind),
    #[error("{0} has already been awarded")]
    AlreadyAwarded(PrizeKind),
    #[error("claim {id} is already {status}")]
    AlreadyDecided { id: ClaimId, status: ClaimStatus },
    #[error("claim {0} not found")]
    NotFound(ClaimId),
}

/// Result of checking a ticket against the called numbers for one prize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimCheck {
    pub kind: PrizeKind,
    pub marked: usize,
    pub needed: usize,
}

impl ClaimCheck {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.marked >= self.needed
    }

    pub fn into_result(self) -> Result<Self, ClaimError> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(ClaimError::NotComplete {
                kind: self.kind,
                marked: self.marked,
                needed: self.needed,
            })
        }
    }
}

/// Numbers on `ticket` that count toward `kind`.
#[must_use]
pub fn pattern_numbers(kind: PrizeKind, ticket: &Ticket) -> Vec<u8> {
    match kind {
        PrizeKind::EarlyFive | PrizeKind::FullHouse => ticket.numbers().collect(),
        PrizeKind::TopLine => ticket.row_numbers(0).collect(),
        PrizeKind::MiddleLine => ticket.row_numbers(1).collect(),
        PrizeKind::BottomLine => ticket.row_numbers(2).collect(),
        PrizeKind::FourCorners => {
            let mut corners = Vec::with_capacity(4);
            for row in [0, 2] {
                let numbers: Vec<u8> = ticket.row_numbers(row).collect();
                corners.extend(numbers.first());
                corners.extend(numbers.last());
            }
            corners
        }
    }
}

#[must_use]
pub fn check_claim(kind: PrizeKind, ticket: &Ticket, called: &CalledNumbers) -> ClaimCheck {
    let pattern = pattern_numbers(kind, ticket);
    let marked = pattern.iter().filter(|n| called.contains(**n)).count();
    let needed = match kind {
        PrizeKind::EarlyFive => EARLY_FIVE,
        PrizeKind::TopLine | PrizeKind::MiddleLine | PrizeKind::BottomLine => NUMBERS_PER_ROW,
        PrizeKind::FourCorners | PrizeKind::FullHouse => pattern.len(),
    };
    ClaimCheck {
        kind,
        marked: marked.min(needed),
        needed,
    }
}

/// Validate a status change for claim `id`.
pub fn transition(id: ClaimId, from: ClaimStatus, to: ClaimStatus) -> Result<(), ClaimError> {
    if from.can_become(to) {
        Ok(())
    } else {
        Err(ClaimError::AlreadyDecided { id, status: from })
    }
}
