//! Filesystem setup for the game database.
//!
//! The database holds device ids and claim history, so the file and the
//! SQLite `-wal`/`-shm` sidecars are kept readable by the owner only.

use std::fs::{self, OpenOptions};
use std::iter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[cfg(unix)]
const DB_FILE_MODE: u32 = 0o600;
#[cfg(unix)]
const DATA_DIR_MODE: u32 = 0o700;

const SIDECAR_SUFFIXES: [&str; 2] = ["-wal", "-shm"];

/// Make sure the game database file exists with owner-only access.
pub(crate) fn prepare_game_db(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create game data directory {}", dir.display()))?;
        #[cfg(unix)]
        restrict_data_dir(dir)?;
    }

    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(DB_FILE_MODE);
    }
    options
        .open(path)
        .with_context(|| format!("Failed to create game database {}", path.display()))?;

    #[cfg(unix)]
    restrict_db_files(path)?;
    Ok(())
}

/// The database path followed by its sidecar paths.
#[cfg_attr(not(unix), allow(dead_code))]
fn db_files(path: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    let name = path
        .file_name()
        .map_or_else(|| path.as_os_str().to_owned(), ToOwned::to_owned);
    iter::once(path.to_path_buf()).chain(SIDECAR_SUFFIXES.iter().map(move |suffix| {
        let mut sidecar = name.clone();
        sidecar.push(suffix);
        path.with_file_name(sidecar)
    }))
}

#[cfg(unix)]
fn restrict_data_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::{MetadataExt, PermissionsExt};

    let metadata = fs::metadata(dir)
        .with_context(|| format!("Failed to inspect game data directory {}", dir.display()))?;

    // SAFETY: getuid has no preconditions and cannot fail.
    let uid = unsafe { libc::getuid() };
    if metadata.uid() != uid {
        tracing::debug!(dir = %dir.display(), "Data directory owned by another user; leaving mode as is");
        return Ok(());
    }
    if metadata.mode() & 0o077 == 0 {
        return Ok(());
    }
    fs::set_permissions(dir, fs::Permissions::from_mode(DATA_DIR_MODE))
        .with_context(|| format!("Failed to restrict game data directory {}", dir.display()))
}

#[cfg(unix)]
fn restrict_db_files(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = || fs::Permissions::from_mode(DB_FILE_MODE);
    let mut files = db_files(path);
    if let Some(db) = files.next() {
        fs::set_permissions(&db, mode())
            .with_context(|| format!("Failed to restrict game database {}", db.display()))?;
    }
    // Sidecars come and go with SQLite checkpoints; a failure here is not fatal.
    for sidecar in files.filter(|file| file.exists()) {
        if let Err(err) = fs::set_permissions(&sidecar, mode()) {
            tracing::warn!(file = %sidecar.display(), error = %err, "Failed to restrict database sidecar");
        }
    }
    Ok(())
}
