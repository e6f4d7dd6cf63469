//! End-to-end tests: default airline study -> sessions -> flat files ->
//! contingency tables.

use cooccur_core::grouping::InteractionPatternGrouping;
use cooccur_core::records::{read_sessions, write_contingency, write_dataset_variants};
use cooccur_core::{
    ContingencyAggregator, ContingencyTable, DatasetGenerator, GroupingRule, SegmentGrouping,
    SessionTable, StudyConfig,
};
use tempfile::tempdir;

// =============================================================================
// Helpers
// =============================================================================

fn small_study(num_actors: usize, seed: u64) -> StudyConfig {
    let mut config = StudyConfig::default();
    config.generation.num_actors = num_actors;
    config.generation.seed = seed;
    config
}

fn generate(config: &StudyConfig) -> SessionTable {
    let catalogs = config.catalogs().expect("study must validate");
    DatasetGenerator::new(&config.generation, &catalogs.entities, &catalogs.segments)
        .generate()
        .table
}

/// Every row sum equals the entity's visit count across all sessions.
fn assert_row_sums(table: &ContingencyTable, sessions: &SessionTable) {
    for (row, total) in table.row_totals().iter().enumerate() {
        let entity = &table.rows()[row];
        let col = sessions.entity_index(entity).expect("row is an entity column");
        let expected = sessions
            .sessions
            .iter()
            .filter(|s| s.visits.is_visited(col))
            .count() as u64;
        assert_eq!(*total, expected, "row sum for {}", entity);
    }
}

/// Column sums are bounded by group population × entities and at least
/// the population when every session visited something.
fn assert_col_bounds<G: GroupingRule>(table: &ContingencyTable, sessions: &SessionTable, rule: &G) {
    for (col, total) in table.col_totals().iter().enumerate() {
        let key = &table.cols()[col];
        let members: Vec<_> = sessions
            .sessions
            .iter()
            .filter(|s| &rule.group_key(s) == key)
            .collect();
        let visits: u64 = members.iter().map(|s| s.visits.count() as u64).sum();
        assert_eq!(*total, visits, "column sum for {}", key);
        assert!(*total >= members.len() as u64, "every generated session visits at least once");
        assert!(*total <= (members.len() * sessions.entity_ids.len()) as u64);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_identical_seed_gives_identical_tables() {
    let config = small_study(5_000, 42);
    let first = generate(&config);
    let second = generate(&config);
    assert_eq!(first, second);

    let aggregator = ContingencyAggregator::new(config.quality.clone());
    assert_eq!(
        aggregator.aggregate(&first, &SegmentGrouping),
        aggregator.aggregate(&second, &SegmentGrouping)
    );
}

#[test]
fn test_generated_sessions_are_binary_and_bounded() {
    let sessions = generate(&small_study(5_000, 9));
    assert_eq!(sessions.len(), 5_000);
    for session in &sessions.sessions {
        let count = session.visits.count();
        assert!((1..=5).contains(&count), "{} visited {}", session.actor_id, count);
        assert!(session.visits.as_binary().iter().all(|&v| v == 0 || v == 1));
    }
}

#[test]
fn test_all_grouping_variants_satisfy_sum_properties() {
    let config = small_study(8_000, 42);
    let catalogs = config.catalogs().unwrap();
    let sessions = generate(&config);
    let aggregator = ContingencyAggregator::new(config.quality.clone());

    let segment = aggregator.aggregate(&sessions, &SegmentGrouping);
    assert_row_sums(&segment, &sessions);
    assert_col_bounds(&segment, &sessions, &SegmentGrouping);

    let pattern = aggregator.aggregate(&sessions, &InteractionPatternGrouping);
    assert_row_sums(&pattern, &sessions);
    assert_col_bounds(&pattern, &sessions, &InteractionPatternGrouping);
    assert!(!pattern.cols().iter().any(|c| c == "no_visits"));

    let affinity = aggregator.aggregate(&sessions, &catalogs.affinity);
    assert_row_sums(&affinity, &sessions);
    assert_col_bounds(&affinity, &sessions, &catalogs.affinity);
}

#[test]
fn test_segment_preferences_show_in_table() {
    let config = small_study(20_000, 42);
    let sessions = generate(&config);
    let table = ContingencyAggregator::default().aggregate(&sessions, &SegmentGrouping);

    // Business UK and European segments never consider Ryanair.
    assert_eq!(table.get("Ryanair", "business_uk"), Some(0));
    assert_eq!(table.get("Ryanair", "business_european"), Some(0));

    // Budget travellers mostly pick Ryanair; Virgin only rides along on
    // longer sessions.
    let budget = sessions
        .sessions
        .iter()
        .filter(|s| s.segment_id == "budget_conscious")
        .count() as f64;
    let ryanair = table.get("Ryanair", "budget_conscious").unwrap();
    let virgin = table.get("Virgin_Atlantic", "budget_conscious").unwrap();
    assert!(ryanair as f64 / budget > 0.8, "ryanair reach {} of {}", ryanair, budget);
    assert!(ryanair > virgin * 3, "ryanair {} vs virgin {}", ryanair, virgin);
}

#[test]
fn test_files_round_trip_into_same_tables() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("synthetic_visits.csv");
    let config = small_study(2_000, 3);
    let sessions = generate(&config);

    let analysis_path = write_dataset_variants(&path, &sessions).unwrap();
    assert!(analysis_path.exists());

    let reloaded = read_sessions(&path).unwrap();
    assert_eq!(reloaded, sessions);

    let aggregator = ContingencyAggregator::default();
    let table = aggregator.aggregate(&reloaded, &SegmentGrouping);
    assert_eq!(table, aggregator.aggregate(&sessions, &SegmentGrouping));

    let table_path = dir.path().join("segment_contingency.csv");
    write_contingency(&table_path, &table).unwrap();
    let content = std::fs::read_to_string(&table_path).unwrap();
    let header = content.lines().next().unwrap();
    assert_eq!(
        header,
        "entity,budget_conscious,business_european,business_uk,leisure_premium,price_shopper"
    );
    assert_eq!(content.lines().count(), 6);
}

#[test]
fn test_parallel_generation_and_aggregation() {
    let mut config = small_study(4_000, 42);
    config.generation.parallel = true;
    let catalogs = config.catalogs().unwrap();

    let mut generator = DatasetGenerator::new(&config.generation, &catalogs.entities, &catalogs.segments);
    let first = generator.run();
    let second = generator.run();
    assert_eq!(first.table, second.table);

    let aggregator = ContingencyAggregator::default();
    let sequential = aggregator.aggregate(&first.table, &catalogs.affinity);
    let parallel = aggregator.aggregate_parallel(&first.table, &catalogs.affinity, 333);
    assert_eq!(parallel, sequential);
}
