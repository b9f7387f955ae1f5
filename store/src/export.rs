//! JSON snapshot of the whole game.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use crate::{Claim, GameStore, Player, Result, now_iso8601};

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub exported_at: String,
    pub players: Vec<Player>,
    /// Called numbers in call order.
    pub called: Vec<u8>,
    pub claims: Vec<Claim>,
    pub issued_fingerprints: usize,
}

impl GameStore {
    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            exported_at: now_iso8601(),
            players: self.list_players()?,
            called: self.called_numbers()?.as_slice().to_vec(),
            claims: self.list_claims()?,
            issued_fingerprints: self.fingerprint_count()?,
        })
    }

    /// Write a [`Snapshot`] to `path` as pretty JSON.
    ///
    /// The file is written to a temp file beside `path` and renamed into
    /// place, so readers never see a partial export.
    pub fn export_json(&self, path: impl AsRef<Path>) -> Result<Snapshot> {
        let path = path.as_ref();
        let snapshot = self.snapshot()?;
        let bytes = serde_json::to_vec_pretty(&snapshot).context("Failed to serialize snapshot")?;

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

        let mut tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        tmp.write_all(&bytes).context("Failed to write snapshot")?;
        tmp.as_file().sync_all().context("Failed to sync snapshot")?;
        tmp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to persist snapshot to {}", path.display()))?;

        info!(
            path = %path.display(),
            players = snapshot.players.len(),
            claims = snapshot.claims.len(),
            "Exported game snapshot"
        );
        Ok(snapshot)
    }
}
