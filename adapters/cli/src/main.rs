#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays scripted Fire Drill scenarios headlessly.

mod drill;
mod scenario;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fire_drill_core::WELCOME_BANNER;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::{drill::DrillOutcome, scenario::Scenario};

/// Fire Drill scenario runner.
#[derive(Debug, Parser)]
#[command(name = "fire-drill", version, about = "Headless runner for fire-safety drill scenarios")]
struct Cli {
    /// Logging verbosity: trace, debug, info, warn or error.
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Play a scenario and print the session report.
    Run {
        /// Scenario file to play.
        scenario: PathBuf,

        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Load and validate a scenario without playing it.
    Check {
        /// Scenario file to validate.
        scenario: PathBuf,
    },
}

/// Entry point for the Fire Drill command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Run { scenario, json } => run(&scenario, json),
        Commands::Check { scenario } => check(&scenario),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install the tracing subscriber")?;
    Ok(())
}

fn load(path: &Path) -> Result<Scenario> {
    Scenario::load(path).with_context(|| format!("invalid scenario {}", path.display()))
}

fn run(path: &Path, json: bool) -> Result<()> {
    let scenario = load(path)?;
    info!(scenario = %path.display(), "{WELCOME_BANNER}");
    let outcome = drill::run(&scenario);

    if json {
        let rendered =
            serde_json::to_string_pretty(&outcome).context("failed to serialise the outcome")?;
        println!("{rendered}");
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

fn check(path: &Path) -> Result<()> {
    let scenario = load(path)?;
    println!(
        "{}: ok ({} fires, {} emitters, {} script entries)",
        path.display(),
        scenario.fires.len(),
        scenario.emitters.len(),
        scenario.script.len()
    );
    Ok(())
}

fn print_outcome(outcome: &DrillOutcome) {
    println!(
        "frames: {} (wall {:.1}s, simulated {:.1}s)",
        outcome.frames, outcome.wall_secs, outcome.simulated_secs
    );
    for fire in &outcome.fires {
        let state = match (fire.ignited, fire.state, fire.remaining_percent) {
            (false, _, _) => "never ignited".to_owned(),
            (true, Some(state), Some(percent)) => format!("{state:?} at {percent:.0}%"),
            (true, Some(state), None) => format!("{state:?}, removed"),
            (true, None, _) => "removed".to_owned(),
        };
        println!("  #{} {}: {state}", fire.id, fire.name);
    }

    match outcome.report {
        Some(report) => {
            println!(
                "fires extinguished: {}/{}",
                report.fires_extinguished, report.fires_activated
            );
            println!("from fires: {:.1}%", report.percent_from_fires);
            println!("exit bonus: {:.1}%", report.exit_bonus_percent);
            println!(
                "total: {:.1}% in {:.1}s",
                report.total_percent,
                report.time_taken.as_secs_f64()
            );
            println!("score: {}", report.score);
        }
        None => println!("trainee never reached the exit; score: {}", outcome.score),
    }
}
