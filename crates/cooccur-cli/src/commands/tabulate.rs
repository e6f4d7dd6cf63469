//! `tabulate`: build contingency tables from a raw dataset.
//!
//! Writes `<prefix>_segment_contingency.csv`,
//! `<prefix>_visit_pattern_contingency.csv` and
//! `<prefix>_affinity_contingency.csv` into the output directory.

use std::path::{Path, PathBuf};

use clap::Args;
use cooccur_core::records::{read_sessions, write_contingency};
use cooccur_core::{
    AffinityGrouping, ContingencyAggregator, CooccurResult, GroupingRule,
    InteractionPatternGrouping, SegmentGrouping, SessionTable, StudyConfig,
};
use tracing::info;

use super::fail;

/// Arguments for the tabulate command.
#[derive(Args)]
pub struct TabulateArgs {
    /// Labeled raw dataset (actor_id, segment, entity columns)
    #[arg(short, long, default_value = "synthetic_visits.csv")]
    pub input: PathBuf,

    /// Study configuration providing affinity rules and quality settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for the contingency tables
    #[arg(short = 'd', long, default_value = ".")]
    pub out_dir: PathBuf,

    /// File name prefix for the contingency tables
    #[arg(long, default_value = "interaction")]
    pub prefix: String,

    /// Warn when any cell is below this count (overrides the config)
    #[arg(long)]
    pub min_cell_count: Option<u64>,

    /// Aggregate on all cores
    #[arg(long)]
    pub parallel: bool,
}

pub fn handle_tabulate(args: TabulateArgs) -> i32 {
    let mut study = match StudyConfig::load(args.config.as_deref()) {
        Ok(study) => study,
        Err(e) => return fail("Failed to load study", e),
    };
    if let Some(min) = args.min_cell_count {
        study.quality.min_cell_count = min;
    }

    let sessions = match read_sessions(&args.input) {
        Ok(sessions) => sessions,
        Err(e) => return fail("Failed to read sessions", e),
    };

    // Affinity subsets resolve against the file's own entity columns.
    let affinity = match study.affinity.resolve(&sessions.entity_ids) {
        Ok(affinity) => affinity,
        Err(e) => return fail("Invalid affinity rules", e),
    };

    let aggregator = ContingencyAggregator::new(study.quality.clone());
    match write_tables(&aggregator, &sessions, &affinity, &args) {
        Ok(paths) => {
            for path in paths {
                info!("Contingency table saved: {}", path.display());
            }
            0
        }
        Err(e) => fail("Failed to write contingency tables", e),
    }
}

fn write_tables(
    aggregator: &ContingencyAggregator,
    sessions: &SessionTable,
    affinity: &AffinityGrouping,
    args: &TabulateArgs,
) -> CooccurResult<Vec<PathBuf>> {
    std::fs::create_dir_all(&args.out_dir)?;

    let rules: [&(dyn GroupingRule + Sync); 3] =
        [&SegmentGrouping, &InteractionPatternGrouping, affinity];

    let mut written = Vec::with_capacity(rules.len());
    for rule in rules {
        let table = if args.parallel {
            aggregator.aggregate_parallel(sessions, rule, 10_000)
        } else {
            aggregator.aggregate(sessions, rule)
        };
        info!("Contingency table by {}:", rule.name());
        table.log_summary();

        let path = table_path(&args.out_dir, &args.prefix, rule.name());
        write_contingency(&path, &table)?;
        written.push(path);
    }

    Ok(written)
}

fn table_path(dir: &Path, prefix: &str, rule: &str) -> PathBuf {
    dir.join(format!("{}_{}_contingency.csv", prefix, rule))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_path_naming() {
        let path = table_path(Path::new("out"), "airline", "visit_pattern");
        assert_eq!(path, Path::new("out/airline_visit_pattern_contingency.csv"));
    }
}
