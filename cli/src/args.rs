//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, value_parser};

use tambola_types::{ClaimId, PrizeKind};

#[derive(Debug, Parser)]
#[command(name = "tambola")]
#[command(about = "Issue unique Tambola tickets and run the game")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub(crate) enum Command {
    /// Print a freshly generated ticket without touching the database
    Ticket {
        /// Seed for a reproducible ticket
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Issue a unique ticket to a player
    Register {
        /// Player name (1 to 64 characters)
        name: String,
        /// Device id to register; a new one is generated when omitted
        #[arg(long)]
        device: Option<String>,
    },
    /// Show a player's ticket
    Show {
        /// Ticket code or device id
        key: String,
    },
    /// List registered players
    Players,
    /// Call a number, or draw the next one at random
    Call {
        #[arg(value_parser = value_parser!(u8).range(1..=90))]
        number: Option<u8>,
    },
    /// List called numbers in call order
    Called,
    /// Claim a prize for a player
    Claim {
        /// Device id of the claiming player
        device: String,
        /// early-five, top-line, middle-line, bottom-line, four-corners or full-house
        prize: PrizeKind,
    },
    /// List claims
    Claims,
    /// Approve a pending claim
    Approve { id: ClaimId },
    /// Reject a pending claim
    Reject { id: ClaimId },
    /// Clear called numbers and claims, keeping players
    Reset,
    /// Write a JSON snapshot of the game
    Export { path: PathBuf },
    /// Check the database and print counts
    Health,
}
