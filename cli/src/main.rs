//! Tambola CLI: ticket issuance and game administration.
//!
//! ```text
//! main() -> Cli::parse() -> init_tracing() -> TambolaConfig::load()
//!                                   |
//!                                   v
//!                 commands::run(Command, Settings, stdout)
//! ```
//!
//! Command output goes to stdout; logs go to `~/.tambola/logs/tambola.log`.

mod args;
mod commands;

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    sync::Mutex,
};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tambola_config::TambolaConfig;

use crate::args::{Cli, Command};
use crate::commands::Settings;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::debug!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // Stdout carries command output, so the last resort is stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!("Failed to create log dir {}: {e}", parent.display()));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!("Failed to open log file {}: {e}", candidate.display()));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(dir) = tambola_config::tambola_dir() {
        candidates.push(dir.join("logs").join("tambola.log"));
    }
    candidates.push(PathBuf::from(".tambola").join("logs").join("tambola.log"));

    candidates
}

fn load_config() -> TambolaConfig {
    match TambolaConfig::load() {
        Ok(Some(config)) => config,
        Ok(None) => TambolaConfig::default(),
        Err(err) => {
            tracing::warn!(path = %err.path().display(), "Using default config: {err}");
            TambolaConfig::default()
        }
    }
}

fn try_main(command: Command) -> Result<()> {
    let settings = Settings::from_config(&load_config());
    tracing::debug!(?command, db = %settings.db_path.display(), "Running command");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    commands::run(command, &settings, &mut out)?;
    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match try_main(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
