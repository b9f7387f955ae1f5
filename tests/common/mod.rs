//! Shared test utilities and fixtures

#![allow(dead_code)]

use std::sync::Arc;

use rand::RngCore;
use tempfile::TempDir;

use tambola_store::GameStore;

/// RNG that only ever yields zero bits, so every `random_range` returns its
/// lower bound and every shuffle is the identity.
pub struct ZeroRng;

impl RngCore for ZeroRng {
    fn next_u32(&mut self) -> u32 {
        0
    }

    fn next_u64(&mut self) -> u64 {
        0
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        dst.fill(0);
    }
}

/// A file-backed store in a fresh temp directory. Keep the `TempDir` alive
/// for as long as the store is used.
pub fn temp_store() -> (TempDir, Arc<GameStore>) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = GameStore::open(dir.path().join("tambola.db")).expect("open store");
    (dir, Arc::new(store))
}
