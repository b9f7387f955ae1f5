//! Core domain logic for Tambola.
//!
//! This crate owns the hard parts of issuing tickets:
//! ticket generation, the uniqueness registry that guards against handing
//! out the same grid twice, number calling, and prize pattern checks.
//!
//! # Architecture
//!
//! ```text
//! Registry<S: FingerprintStore>
//! ├── generate_unique(source, max_attempts) -> IssuedTicket
//! │     └── TicketSource (Generator<R: Rng>)
//! └── store: MemoryFingerprints | GameStore (tambola-store)
//! ```

pub mod caller;
pub mod claims;
pub mod generator;
pub mod registry;

pub use caller::draw_number;
pub use claims::{ClaimCheck, ClaimError, check_claim, pattern_numbers};
pub use generator::{Generator, TicketSource, generate_ticket, generate_ticket_with};
pub use registry::{
    DEFAULT_MAX_ATTEMPTS, FingerprintStore, IssuedTicket, MemoryFingerprints, Registry,
    RegistryError,
};
