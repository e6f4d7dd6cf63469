//! `generate`: simulate sessions and write the raw dataset.

use std::path::PathBuf;

use clap::Args;
use cooccur_core::records::write_dataset_variants;
use cooccur_core::{CooccurResult, DatasetGenerator, InteractionDataset, StudyConfig};
use tracing::info;

use super::fail;

/// Arguments for the generate command.
#[derive(Args)]
pub struct GenerateArgs {
    /// Study configuration (TOML); defaults to the built-in airline study
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output file for the labeled dataset
    #[arg(short, long, default_value = "synthetic_visits.csv")]
    pub output: PathBuf,

    /// Number of actors (overrides the config)
    #[arg(short = 'n', long)]
    pub num_actors: Option<usize>,

    /// Random seed (overrides the config)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Generate on all cores with per-actor random streams
    #[arg(long)]
    pub parallel: bool,

    /// Also write summary statistics as JSON
    #[arg(long)]
    pub stats_json: Option<PathBuf>,
}

pub fn handle_generate(args: GenerateArgs) -> i32 {
    let mut study = match StudyConfig::load(args.config.as_deref()) {
        Ok(study) => study,
        Err(e) => return fail("Failed to load study", e),
    };
    if let Some(n) = args.num_actors {
        study.generation.num_actors = n;
    }
    if let Some(seed) = args.seed {
        study.generation.seed = seed;
    }
    study.generation.parallel |= args.parallel;

    match run(&study, &args) {
        Ok(dataset) => {
            info!(
                "Generated {} sessions with seed {}",
                dataset.table.len(),
                dataset.config.seed
            );
            0
        }
        Err(e) => fail("Dataset generation failed", e),
    }
}

fn run(study: &StudyConfig, args: &GenerateArgs) -> CooccurResult<InteractionDataset> {
    let catalogs = study.catalogs()?;
    let dataset =
        DatasetGenerator::new(&study.generation, &catalogs.entities, &catalogs.segments).run();
    dataset.stats.log_summary();

    write_dataset_variants(&args.output, &dataset.table)?;

    if let Some(path) = &args.stats_json {
        let json = dataset.stats.to_json()?;
        std::fs::write(path, json)?;
        info!("Statistics saved to '{}'", path.display());
    }

    Ok(dataset)
}
