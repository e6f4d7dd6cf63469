//! `init-config`: write the default study as TOML.

use std::path::PathBuf;

use clap::Args;
use cooccur_core::StudyConfig;
use tracing::info;

use super::fail;

/// Arguments for the init-config command.
#[derive(Args)]
pub struct InitConfigArgs {
    /// Destination file (prints to stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn handle_init_config(args: InitConfigArgs) -> i32 {
    let toml = match StudyConfig::default().to_toml() {
        Ok(toml) => toml,
        Err(e) => return fail("Failed to serialize default study", e),
    };

    match args.output {
        None => {
            print!("{}", toml);
            0
        }
        Some(path) => {
            if path.exists() && !args.force {
                eprintln!(
                    "Error: {} already exists (use --force to overwrite)",
                    path.display()
                );
                return 1;
            }
            match std::fs::write(&path, toml) {
                Ok(()) => {
                    info!("Default study written to '{}'", path.display());
                    0
                }
                Err(e) => fail("Failed to write study config", e),
            }
        }
    }
}
