//! `~/.tambola/config.toml` loading.
//!
//! Every section is optional; a missing file means defaults everywhere.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use tambola_core::DEFAULT_MAX_ATTEMPTS;

/// Overrides the database location ahead of any config file setting.
pub const DB_ENV_VAR: &str = "TAMBOLA_DB";

/// Set by hosts whose disk is wiped between deploys.
const EPHEMERAL_HOST_VARS: [&str; 2] = ["RENDER", "RAILWAY_ENVIRONMENT"];

const DB_FILE_NAME: &str = "tambola.db";

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TambolaConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub issuance: IssuanceConfig,
    #[serde(default)]
    pub game: GameConfig,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Database file. `${VAR}` references are expanded.
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssuanceConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameConfig {
    /// Accept claims whose pattern is not yet complete, leaving the decision
    /// to an admin.
    #[serde(default)]
    pub allow_unverified_claims: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

impl TambolaConfig {
    /// Load the user config. `Ok(None)` when there is no home directory or
    /// no config file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|source| {
            tracing::warn!("Failed to read config at {}: {source}", path.display());
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        toml::from_str(&content).map(Some).map_err(|source| {
            tracing::warn!("Failed to parse config at {}: {source}", path.display());
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Database location, in order: `TAMBOLA_DB`, `[store].path`, `/tmp` on
    /// ephemeral hosts, `~/.tambola/`, the working directory.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        resolve_db_path(
            env::var_os(DB_ENV_VAR).map(PathBuf::from),
            self.store.path.as_deref().map(expand_env_vars),
            EPHEMERAL_HOST_VARS.iter().any(|var| env::var_os(var).is_some()),
            tambola_dir(),
        )
    }
}

fn resolve_db_path(
    env_override: Option<PathBuf>,
    configured: Option<String>,
    ephemeral_host: bool,
    home_dir: Option<PathBuf>,
) -> PathBuf {
    if let Some(path) = env_override.filter(|p| !p.as_os_str().is_empty()) {
        return path;
    }
    if let Some(path) = configured.filter(|p| !p.trim().is_empty()) {
        return PathBuf::from(path);
    }
    if ephemeral_host {
        return env::temp_dir().join(DB_FILE_NAME);
    }
    match home_dir {
        Some(dir) => dir.join(DB_FILE_NAME),
        None => PathBuf::from(DB_FILE_NAME),
    }
}

/// `~/.tambola`, if a home directory is known.
#[must_use]
pub fn tambola_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".tambola"))
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    tambola_dir().map(|dir| dir.join("config.toml"))
}

/// Replace `${VAR}` with the variable's value (empty if unset).
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + len];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + len + 1..];
    }

    out.push_str(rest);
    out
}
