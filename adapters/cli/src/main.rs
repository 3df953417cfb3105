#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays geomerge in a terminal.

mod config;
mod input;
mod session;
mod text;

use std::{
    io::{self, BufRead},
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use geomerge_core::{Command, MovementMode};
use geomerge_rendering::{RenderingBackend, MAX_VIEW_RADIUS};
use geomerge_system_persistence::{FileStore, MemoryStore, SnapshotStore};
use geomerge_world::query;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use config::CliConfig;
use input::{parse_line, Input, HELP};
use session::Session;
use text::{status_line, summary, TextBackend};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Collect and merge tokens scattered over the map",
    long_about = None
)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// File the session is saved to, overriding the configuration file.
    #[arg(long)]
    save_file: Option<PathBuf>,
    /// Play without reading or writing a saved session.
    #[arg(long)]
    no_save: bool,
    /// Movement mode to switch to after startup (step or feed).
    #[arg(long, value_parser = parse_mode)]
    mode: Option<MovementMode>,
    /// Number of cells drawn around the player by `look`.
    #[arg(long)]
    view_radius: Option<u32>,
}

/// Entry point for the geomerge command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging()?;

    let mut config = CliConfig::discover(args.config.as_deref())?;
    if let Some(radius) = args.view_radius {
        config.view_radius = radius;
    }
    if let Some(path) = args.save_file {
        config.save_file = Some(path);
    }
    if config.view_radius > MAX_VIEW_RADIUS {
        bail!("view radius must be at most {MAX_VIEW_RADIUS}");
    }

    let store = open_store(&config, args.no_save)?;
    let mut session = Session::start(config.rules, store, unix_now)?;
    if let Some(mode) = args.mode {
        let _ = session.submit(Command::SetMovementMode { mode });
    }

    let mut backend = TextBackend::new(io::stdout());
    println!("{}", query::welcome_banner(session.world()));
    println!("{}", status_line(query::status(session.world())));

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read input")?;
        let input = match parse_line(&line) {
            Ok(Some(Input::Quit)) => break,
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(error) => {
                println!("error: {error:#}");
                continue;
            }
        };
        if let Err(error) = run(&mut session, &mut backend, input, config.view_radius) {
            println!("error: {error:#}");
        }
    }

    info!("session ended");
    Ok(())
}

fn run<S, B>(
    session: &mut Session<S>,
    backend: &mut B,
    input: Input,
    view_radius: u32,
) -> Result<()>
where
    S: SnapshotStore,
    B: RenderingBackend,
{
    let events = match input {
        Input::Step { direction, count } => session.step(direction, count)?,
        Input::Click(cell) => session.submit(Command::Interact { cell }),
        Input::Tap { column, row } => match session.cell_on_map(view_radius, column, row)? {
            Some(cell) => session.submit(Command::Interact { cell }),
            None => bail!("nothing is drawn at column {column}, row {row}"),
        },
        Input::Fix(position) => {
            if let Some(error) = session.push_fix(Ok(position))? {
                println!("location update failed: {error}");
            }
            Vec::new()
        }
        Input::Fail(failure) => {
            if let Some(error) = session.push_fix(Err(failure))? {
                println!("location update failed: {error}");
            }
            return Ok(());
        }
        Input::Mode(mode) => session.submit(Command::SetMovementMode { mode }),
        Input::Look => {
            return backend.present(&session.scene(view_radius)?);
        }
        Input::Status => {
            println!("{}", summary(&session.scene(0)?.hud));
            Vec::new()
        }
        Input::Export => {
            println!("{}", session.export()?);
            return Ok(());
        }
        Input::Import(payload) => session.import(&payload)?,
        Input::NewGame => session.submit(Command::NewGame),
        Input::Help | Input::Quit => {
            println!("{HELP}");
            return Ok(());
        }
    };

    debug!(events = events.len(), "command applied");
    println!("{}", status_line(query::status(session.world())));
    Ok(())
}

fn open_store(config: &CliConfig, no_save: bool) -> Result<Box<dyn SnapshotStore>> {
    if no_save {
        info!("saving disabled for this session");
        return Ok(Box::new(MemoryStore::new()));
    }

    let store = match &config.save_file {
        Some(path) => FileStore::new(path),
        None => FileStore::in_data_dir().context("could not locate a directory for saved games")?,
    };
    info!(path = %store.path().display(), "saving session");
    Ok(Box::new(store))
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| anyhow!(error))
}

fn parse_mode(name: &str) -> Result<MovementMode, String> {
    MovementMode::parse(name).ok_or_else(|| format!("unknown movement mode `{name}`"))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
