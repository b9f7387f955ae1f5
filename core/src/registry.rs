//! Uniqueness registry for issued tickets.
//!
//! The registry is an explicit object: construct it once at startup and share
//! it (by reference or `Arc`) with every request that issues tickets. The
//! check-and-insert lives behind [`FingerprintStore::insert_if_absent`], which
//! every backend must implement as a single atomic step.

use std::collections::HashSet;
use std::error::Error as StdError;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, warn};

use tambola_types::{Fingerprint, Ticket};

use crate::generator::{Generator, TicketSource};

/// Attempts used by callers that have no configured limit.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("fingerprint store failed: {message}")]
    Store {
        message: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },
}

impl RegistryError {
    pub fn store(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: source.into(),
        }
    }
}

/// Backing set of issued fingerprints.
pub trait FingerprintStore: Send + Sync {
    /// Insert `fingerprint` unless present. Returns `true` when it was newly
    /// inserted. Must be atomic with respect to concurrent callers.
    fn insert_if_absent(&self, fingerprint: &Fingerprint) -> Result<bool, RegistryError>;

    fn contains(&self, fingerprint: &Fingerprint) -> Result<bool, RegistryError>;

    fn len(&self) -> Result<usize, RegistryError>;
}

impl<T: FingerprintStore + ?Sized> FingerprintStore for &T {
    fn insert_if_absent(&self, fingerprint: &Fingerprint) -> Result<bool, RegistryError> {
        (**self).insert_if_absent(fingerprint)
    }

    fn contains(&self, fingerprint: &Fingerprint) -> Result<bool, RegistryError> {
        (**self).contains(fingerprint)
    }

    fn len(&self) -> Result<usize, RegistryError> {
        (**self).len()
    }
}

impl<T: FingerprintStore + ?Sized> FingerprintStore for Arc<T> {
    fn insert_if_absent(&self, fingerprint: &Fingerprint) -> Result<bool, RegistryError> {
        (**self).insert_if_absent(fingerprint)
    }

    fn contains(&self, fingerprint: &Fingerprint) -> Result<bool, RegistryError> {
        (**self).contains(fingerprint)
    }

    fn len(&self) -> Result<usize, RegistryError> {
        (**self).len()
    }
}

/// Process-local fingerprint set.
#[derive(Debug, Default)]
pub struct MemoryFingerprints {
    seen: Mutex<HashSet<Fingerprint>>,
}

impl MemoryFingerprints {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FingerprintStore for MemoryFingerprints {
    fn insert_if_absent(&self, fingerprint: &Fingerprint) -> Result<bool, RegistryError> {
        // A panic mid-insert cannot leave the set half-updated, so a poisoned
        // lock is still safe to use.
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(seen.insert(fingerprint.clone()))
    }

    fn contains(&self, fingerprint: &Fingerprint) -> Result<bool, RegistryError> {
        let seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(seen.contains(fingerprint))
    }

    fn len(&self) -> Result<usize, RegistryError> {
        let seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(seen.len())
    }
}

/// A ticket handed out by [`Registry::generate_unique`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedTicket {
    ticket: Ticket,
    fingerprint: Fingerprint,
    attempts: u32,
    unique: bool,
}

impl IssuedTicket {
    #[must_use]
    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }

    #[must_use]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Number of candidates generated, including the returned one.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// `false` when attempts ran out and this ticket duplicates an earlier one.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique
    }
}

pub struct Registry<S = MemoryFingerprints> {
    store: S,
}

impl Registry<MemoryFingerprints> {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryFingerprints::new())
    }
}

impl Default for Registry<MemoryFingerprints> {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl<S: FingerprintStore> Registry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record `ticket` as issued. Returns `false` (and records nothing) if an
    /// identical ticket was registered before.
    pub fn register(&self, ticket: &Ticket) -> Result<bool, RegistryError> {
        // Hashing stays outside the store's critical section.
        let fingerprint = ticket.fingerprint();
        self.store.insert_if_absent(&fingerprint)
    }

    pub fn is_registered(&self, ticket: &Ticket) -> Result<bool, RegistryError> {
        self.store.contains(&ticket.fingerprint())
    }

    pub fn len(&self) -> Result<usize, RegistryError> {
        self.store.len()
    }

    pub fn is_empty(&self) -> Result<bool, RegistryError> {
        Ok(self.store.len()? == 0)
    }

    /// Draw tickets from `source` until one registers, or `max_attempts` run
    /// out. On exhaustion the last candidate is returned with
    /// [`IssuedTicket::is_unique`] set to `false`. A limit of 0 behaves as 1.
    pub fn generate_unique<T>(
        &self,
        source: &mut T,
        max_attempts: u32,
    ) -> Result<IssuedTicket, RegistryError>
    where
        T: TicketSource + ?Sized,
    {
        let limit = max_attempts.max(1);
        let mut attempts = 0;
        loop {
            attempts += 1;
            let ticket = source.next_ticket();
            let fingerprint = ticket.fingerprint();

            if self.store.insert_if_absent(&fingerprint)? {
                debug!(attempts, fingerprint = fingerprint.short(), "Issued unique ticket");
                return Ok(IssuedTicket {
                    ticket,
                    fingerprint,
                    attempts,
                    unique: true,
                });
            }

            if attempts >= limit {
                warn!(
                    attempts,
                    fingerprint = fingerprint.short(),
                    "Uniqueness attempts exhausted; issuing duplicate ticket"
                );
                return Ok(IssuedTicket {
                    ticket,
                    fingerprint,
                    attempts,
                    unique: false,
                });
            }

            debug!(attempts, fingerprint = fingerprint.short(), "Duplicate ticket; retrying");
        }
    }

    /// [`Self::generate_unique`] over the thread-local RNG.
    pub fn generate_unique_ticket(&self, max_attempts: u32) -> Result<IssuedTicket, RegistryError> {
        let mut generator = Generator::new(rand::rng());
        self.generate_unique(&mut generator, max_attempts)
    }
}
