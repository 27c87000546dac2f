#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays Pursuit levels headlessly.

mod render;

use std::{
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pursuit_system_bootstrap::{Level, Session};
use pursuit_world::query;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Turn-based grid pursuit simulator.
#[derive(Debug, Parser)]
#[command(name = "pursuit", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Plays a level for a number of turns.
    Run(RunArgs),
    /// Validates a level file and builds its world without playing it.
    Check {
        /// Path to the level TOML file.
        level: PathBuf,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Path to the level TOML file.
    level: PathBuf,
    /// Maximum number of turns to play.
    #[arg(long, default_value_t = 20)]
    turns: u32,
    /// Prints an ASCII frame after every turn.
    #[arg(long)]
    render: bool,
    /// Pause between turns in milliseconds.
    #[arg(long, default_value_t = 0)]
    frame_ms: u64,
}

/// Entry point for the Pursuit command-line interface.
fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        CliCommand::Run(args) => run(&args),
        CliCommand::Check { level } => check(&level),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load(path: &Path) -> Result<(Level, Session)> {
    let level = Level::load(path)
        .with_context(|| format!("failed to load level {}", path.display()))?;
    let session = Session::new(&level)
        .with_context(|| format!("failed to build world for level {}", path.display()))?;
    Ok((level, session))
}

fn check(path: &Path) -> Result<()> {
    let (level, _session) = load(path)?;
    println!(
        "{}: {}x{} grid, {} walls, {} agents, {} scripted moves",
        path.display(),
        level.layout.columns(),
        level.layout.rows(),
        level.walls.len(),
        level.agents.len(),
        level.script.len()
    );
    Ok(())
}

fn run(args: &RunArgs) -> Result<()> {
    let (level, mut session) = load(&args.level)?;
    let settle = level.motion.rotation_duration + level.motion.translation_duration;

    if args.render {
        println!("{}", render::frame(session.world()));
    }

    let mut caught_on = None;
    for _ in 0..args.turns {
        let report = session.advance_turn();
        session.tick(settle);

        if args.render {
            println!("turn {}", report.turn);
            println!("{}", render::frame(session.world()));
        }

        if report.caught() {
            caught_on = Some(report.turn);
            break;
        }

        if args.frame_ms > 0 {
            thread::sleep(Duration::from_millis(args.frame_ms));
        }
    }

    match caught_on {
        Some(turn) => {
            info!(turn, "player caught");
            println!("player caught on turn {turn}");
        }
        None => println!(
            "player evaded capture for {} turns",
            query::turn(session.world())
        ),
    }
    Ok(())
}
