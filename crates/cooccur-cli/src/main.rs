//! `cooccur` command line interface.
//!
//! # Usage
//!
//! ```bash
//! # Write the default airline study as an editable TOML file
//! cooccur init-config --output study.toml
//!
//! # Generate 100k synthetic sessions plus the unlabeled analysis variant
//! cooccur generate --config study.toml --output synthetic_visits.csv
//!
//! # Cross-tabulate into segment, visit-pattern and affinity tables
//! cooccur tabulate --input synthetic_visits.csv --out-dir tables/
//! ```
//!
//! Exit codes: 0 on success, 1 on error.

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::{
    generate::{handle_generate, GenerateArgs},
    init::{handle_init_config, InitConfigArgs},
    tabulate::{handle_tabulate, TabulateArgs},
};

/// Synthetic interaction datasets and contingency tables for
/// correspondence analysis.
#[derive(Parser)]
#[command(name = "cooccur")]
#[command(version, about)]
struct Cli {
    /// Verbose (debug) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic session dataset
    Generate(GenerateArgs),

    /// Build contingency tables from a session dataset
    Tabulate(TabulateArgs),

    /// Write the default study configuration as TOML
    InitConfig(InitConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let exit_code = match cli.command {
        Commands::Generate(args) => handle_generate(args),
        Commands::Tabulate(args) => handle_tabulate(args),
        Commands::InitConfig(args) => handle_init_config(args),
    };

    std::process::exit(exit_code);
}
