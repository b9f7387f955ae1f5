//! Command execution. Output goes to the given writer; logs go to tracing.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use tambola_config::TambolaConfig;
use tambola_core::Generator;
use tambola_store::{Claim, GameStore, Player, Registration, TicketDesk};
use tambola_types::{DeviceId, MAX_NUMBER, PlayerName, TicketCode};

use crate::args::Command;

/// Settings resolved from config and environment.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub db_path: PathBuf,
    pub max_attempts: u32,
    pub allow_unverified_claims: bool,
}

impl Settings {
    pub(crate) fn from_config(config: &TambolaConfig) -> Self {
        Self {
            db_path: config.db_path(),
            max_attempts: config.issuance.max_attempts,
            allow_unverified_claims: config.game.allow_unverified_claims,
        }
    }
}

pub(crate) fn run(command: Command, settings: &Settings, out: &mut dyn Write) -> Result<()> {
    if let Command::Ticket { seed } = command {
        return print_ticket(seed, out);
    }
    let store = GameStore::open(&settings.db_path).with_context(|| {
        format!("Failed to open game database {}", settings.db_path.display())
    })?;
    let desk = TicketDesk::with_max_attempts(Arc::new(store), settings.max_attempts);
    run_with_desk(command, &desk, settings, out)
}

/// Print a generated ticket. The database is not opened.
fn print_ticket(seed: Option<u64>, out: &mut dyn Write) -> Result<()> {
    let ticket = match seed {
        Some(seed) => Generator::seeded(seed).generate(),
        None => tambola_core::generate_ticket(),
    };
    writeln!(out, "{ticket}")?;
    writeln!(out, "fingerprint {}", ticket.fingerprint())?;
    Ok(())
}

fn run_with_desk(
    command: Command,
    desk: &TicketDesk,
    settings: &Settings,
    out: &mut dyn Write,
) -> Result<()> {
    let store = desk.store();
    match command {
        Command::Register { name, device } => {
            let name = PlayerName::new(&name)?;
            let device = match device {
                Some(raw) => DeviceId::parse(&raw)?,
                None => DeviceId::generate(),
            };
            let registration = desk.register(&device, &name)?;
            let heading = match &registration {
                Registration::Created(_) => "Registered",
                Registration::Existing(_) => "Already registered",
            };
            writeln!(out, "{heading}")?;
            write_player(out, registration.player())?;
        }
        Command::Show { key } => {
            // A device id may itself look like a ticket code.
            let by_code = match TicketCode::parse(&key) {
                Ok(code) => store.player_by_code(&code)?,
                Err(_) => None,
            };
            let player = match by_code {
                Some(player) => Some(player),
                None => store.player_by_device(&DeviceId::parse(&key)?)?,
            };
            match player {
                Some(player) => write_player(out, &player)?,
                None => bail!("No player found for {key}"),
            }
        }
        Command::Players => {
            let players = store.list_players()?;
            if players.is_empty() {
                writeln!(out, "No players registered")?;
            }
            for player in players {
                writeln!(
                    out,
                    "{:>4}  {}  {}  {}",
                    player.id.value(),
                    player.ticket_code,
                    player.device_id,
                    player.name
                )?;
            }
        }
        Command::Call { number } => {
            let number = match number {
                Some(number) => {
                    store.call_number(number)?;
                    number
                }
                None => store.call_next(&mut rand::rng())?,
            };
            let count = store.called_numbers()?.len();
            writeln!(out, "Called {number} ({count}/{MAX_NUMBER})")?;
        }
        Command::Called => {
            let called = store.called_numbers()?;
            let list: Vec<String> = called.as_slice().iter().map(u8::to_string).collect();
            writeln!(out, "{} called: {}", called.len(), list.join(" "))?;
        }
        Command::Claim { device, prize } => {
            let device = DeviceId::parse(&device)?;
            let claim = store.submit_claim(&device, prize, settings.allow_unverified_claims)?;
            write_claim(out, &claim)?;
        }
        Command::Claims => {
            let claims = store.list_claims()?;
            if claims.is_empty() {
                writeln!(out, "No claims")?;
            }
            for claim in claims {
                write_claim(out, &claim)?;
            }
        }
        Command::Approve { id } => write_claim(out, &store.approve_claim(id)?)?,
        Command::Reject { id } => write_claim(out, &store.reject_claim(id)?)?,
        Command::Reset => {
            store.reset_game()?;
            writeln!(out, "Game reset")?;
        }
        Command::Export { path } => {
            let snapshot = store.export_json(&path)?;
            writeln!(
                out,
                "Exported {} players and {} claims to {}",
                snapshot.players.len(),
                snapshot.claims.len(),
                path.display()
            )?;
        }
        Command::Health => {
            writeln!(
                out,
                "OK db={} players={} tickets={} called={} claims={}",
                settings.db_path.display(),
                store.player_count()?,
                store.fingerprint_count()?,
                store.called_numbers()?.len(),
                store.list_claims()?.len()
            )?;
        }
        Command::Ticket { seed } => print_ticket(seed, out)?,
    }
    Ok(())
}

fn write_player(out: &mut dyn Write, player: &Player) -> io::Result<()> {
    writeln!(out, "Player   #{} {}", player.id, player.name)?;
    writeln!(out, "Device   {}", player.device_id)?;
    writeln!(out, "Code     {}", player.ticket_code)?;
    if !player.unique_ticket {
        writeln!(out, "Warning  ticket duplicates an earlier issue")?;
    }
    writeln!(out, "{}", player.ticket)
}

fn write_claim(out: &mut dyn Write, claim: &Claim) -> io::Result<()> {
    writeln!(
        out,
        "#{} {} {} by {} ({}){}",
        claim.id,
        claim.prize.display_name(),
        claim.status,
        claim.player_name,
        claim.ticket_code,
        if claim.verified { "" } else { " unverified" }
    )
}
