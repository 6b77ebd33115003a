//! Cadence CLI - cadence command

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

mod cmd;

/// Cadence - replay call timelines through debounce and throttle wrappers
#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Rate configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario file
    Replay {
        /// Scenario file (TOML)
        scenario: PathBuf,
        /// Use real time instead of a virtual clock
        #[arg(long)]
        realtime: bool,
        /// Print the timeline as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replay the built-in scenarios and check their expectations
    Demo {
        /// Use real time instead of a virtual clock
        #[arg(long)]
        realtime: bool,
    },
    /// Show the effective rate configuration
    Config {
        /// Print an example configuration file instead
        #[arg(long)]
        example: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cmd::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Replay { scenario, realtime, json } => {
            cmd::replay::run(&scenario, &config, realtime, json).await
        }
        Commands::Demo { realtime } => cmd::demo::run(&config, realtime).await,
        Commands::Config { example } => cmd::config::run(&config, example),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}
