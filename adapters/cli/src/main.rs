#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line driver for maze tanks matches.
//!
//! `run` plays a match between random bots and can record it; `replay`
//! feeds a recorded match back through a fresh world. Both finish by printing
//! the scores and a SHA-256 fingerprint of the final state, so two machines
//! can confirm they simulated the same match.

mod replay_transfer;
mod session;

use std::{fs, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use maze_tanks_core::{from_bytes, to_bytes, Event, MatchConfig, Replay};
use maze_tanks_world::query;

use session::{Bot, Session};

#[derive(Debug, Parser)]
#[command(name = "maze-tanks", about = "Headless maze tanks driver")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Play a match between random bots.
    Run {
        /// TOML file holding the match configuration.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Overrides the match seed.
        #[arg(long)]
        seed: Option<u64>,
        /// Overrides the number of tanks.
        #[arg(long)]
        tanks: Option<u32>,
        /// Number of ticks to simulate.
        #[arg(long, default_value_t = 3_600)]
        ticks: u32,
        /// Writes the recorded inputs to this file.
        #[arg(long)]
        record: Option<PathBuf>,
        /// Prints the recorded inputs as a single-line transfer string.
        #[arg(long)]
        export: bool,
    },
    /// Replay a recorded match.
    Replay {
        /// Binary replay file written by `run --record`.
        #[arg(long, conflicts_with = "code")]
        file: Option<PathBuf>,
        /// Transfer string printed by `run --export`.
        #[arg(long)]
        code: Option<String>,
    },
}

/// Entry point for the maze tanks command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Commands::Run {
            config,
            seed,
            tanks,
            ticks,
            record,
            export,
        } => {
            let mut config = load_config(config)?;
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(tanks) = tanks {
                config.tank_count = tanks;
            }
            run(config, ticks, record, export)
        }
        Commands::Replay { file, code } => {
            let replay = match (file, code) {
                (Some(path), _) => {
                    let bytes = fs::read(&path)
                        .with_context(|| format!("reading replay {}", path.display()))?;
                    from_bytes::<Replay>(&bytes)
                        .with_context(|| format!("decoding replay {}", path.display()))?
                }
                (None, Some(code)) => {
                    replay_transfer::decode(&code).context("decoding replay string")?
                }
                (None, None) => bail!("pass either --file or --code"),
            };
            play_back(replay)
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<MatchConfig> {
    let Some(path) = path else {
        return Ok(MatchConfig::default());
    };
    let text =
        fs::read_to_string(&path).with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn run(config: MatchConfig, ticks: u32, record: Option<PathBuf>, export: bool) -> Result<()> {
    log::info!(
        "running {} ticks with {} tanks, seed {}",
        ticks,
        config.tank_count,
        config.seed
    );
    let mut bots: Vec<Bot> = (0..config.tank_count)
        .map(|tank| Bot::new(config.seed, tank))
        .collect();
    let mut session = Session::new(config)?;
    for _ in 0..ticks {
        let frame = bots.iter_mut().map(Bot::next_keys).collect();
        let events = session.play(frame)?;
        report(&events);
    }
    summarize(&session);

    let replay = session.into_replay();
    if let Some(path) = record {
        fs::write(&path, to_bytes(&replay))
            .with_context(|| format!("writing replay {}", path.display()))?;
        log::info!("replay written to {}", path.display());
    }
    if export {
        println!("{}", replay_transfer::encode(&replay));
    }
    Ok(())
}

fn play_back(replay: Replay) -> Result<()> {
    log::info!(
        "replaying {} ticks with {} tanks, seed {}",
        replay.frames.len(),
        replay.config.tank_count,
        replay.config.seed
    );
    let mut session = Session::new(replay.config)?;
    for frame in replay.frames {
        let events = session.play(frame)?;
        report(&events);
    }
    summarize(&session);
    Ok(())
}

fn report(events: &[Event]) {
    for event in events {
        match event {
            Event::RoundEnded { round, survivors } => {
                println!("round {round} won by {survivors:?}");
            }
            Event::TankKilled { tank, cause } => {
                log::debug!("tank {} destroyed by {cause:?}", tank.get());
            }
            _ => log::trace!("{event:?}"),
        }
    }
}

fn summarize(session: &Session) {
    let world = session.world();
    println!(
        "round {} tick {}",
        query::round(world),
        query::tick(world)
    );
    for tank in query::tank_view(world).iter() {
        println!(
            "tank {}: score {} {}",
            tank.id.get(),
            tank.score,
            if tank.state.alive { "alive" } else { "destroyed" }
        );
    }
    println!("fingerprint {}", session.fingerprint());
}
