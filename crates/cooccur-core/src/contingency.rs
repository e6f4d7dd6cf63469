//! Entity × group contingency tables.
//!
//! Every cell counts the sessions that visited the row's entity and fell
//! into the column's group. Row sums are per-entity visit totals; column
//! sums are the visits made by each group's sessions.
//!
//! Columns are the distinct group keys sorted lexicographically, so tables
//! built from disjoint chunks of sessions can be merged cell-wise into the
//! table a single pass would have produced.

use std::collections::{BTreeSet, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::grouping::{GroupKey, GroupingRule};
use crate::session::SessionTable;

/// Quality thresholds for contingency tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Tables whose smallest cell is below this count trigger a warning.
    pub min_cell_count: u64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self { min_cell_count: 5 }
    }
}

/// Advisory warning about sparse cells. Never aborts processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityWarning {
    pub min_cell: u64,
    pub threshold: u64,
    pub low_cells: usize,
}

/// Entity × group count matrix (row-major).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyTable {
    rows: Vec<String>,
    cols: Vec<GroupKey>,
    cells: Vec<u64>,
}

impl ContingencyTable {
    /// All-zero table.
    pub fn zeros(rows: Vec<String>, cols: Vec<GroupKey>) -> Self {
        let cells = vec![0; rows.len() * cols.len()];
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn cols(&self) -> &[GroupKey] {
        &self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.cols.len())
    }

    /// Cell by position.
    pub fn cell(&self, row: usize, col: usize) -> u64 {
        if row < self.rows.len() && col < self.cols.len() {
            self.cells[row * self.cols.len() + col]
        } else {
            0
        }
    }

    /// Cell by labels.
    pub fn get(&self, row: &str, col: &str) -> Option<u64> {
        let r = self.rows.iter().position(|x| x == row)?;
        let c = self.cols.iter().position(|x| x == col)?;
        Some(self.cell(r, c))
    }

    /// One row of cells.
    pub fn row_values(&self, row: usize) -> &[u64] {
        let width = self.cols.len();
        &self.cells[row * width..(row + 1) * width]
    }

    pub fn row_totals(&self) -> Vec<u64> {
        (0..self.rows.len())
            .map(|r| self.row_values(r).iter().sum())
            .collect()
    }

    pub fn col_totals(&self) -> Vec<u64> {
        (0..self.cols.len())
            .map(|c| (0..self.rows.len()).map(|r| self.cell(r, c)).sum())
            .collect()
    }

    pub fn grand_total(&self) -> u64 {
        self.cells.iter().sum()
    }

    /// Smallest cell, or `None` for an empty table.
    pub fn min_cell(&self) -> Option<u64> {
        self.cells.iter().copied().min()
    }

    /// Warning when the smallest cell is below `threshold`.
    pub fn quality_warning(&self, threshold: u64) -> Option<QualityWarning> {
        let min_cell = self.min_cell()?;
        if min_cell >= threshold {
            return None;
        }
        Some(QualityWarning {
            min_cell,
            threshold,
            low_cells: self.cells.iter().filter(|&&c| c < threshold).count(),
        })
    }

    /// Add `other` cell-wise. Columns become the sorted union of both.
    ///
    /// Rows must match; mismatched rows are kept from `self` and the
    /// unknown rows of `other` are ignored.
    pub fn merge(&mut self, other: &ContingencyTable) {
        if other.cols.iter().any(|c| !self.cols.contains(c)) {
            let union: BTreeSet<GroupKey> = self.cols.iter().chain(other.cols.iter()).cloned().collect();
            self.reindex_cols(union.into_iter().collect());
        }

        let col_map: Vec<usize> = other
            .cols
            .iter()
            .filter_map(|c| self.cols.iter().position(|x| x == c))
            .collect();
        let width = self.cols.len();

        for (other_row, row_id) in other.rows.iter().enumerate() {
            let Some(row) = self.rows.iter().position(|r| r == row_id) else {
                continue;
            };
            for (other_col, &col) in col_map.iter().enumerate() {
                self.cells[row * width + col] += other.cell(other_row, other_col);
            }
        }
    }

    fn reindex_cols(&mut self, cols: Vec<GroupKey>) {
        let mut cells = vec![0; self.rows.len() * cols.len()];
        for (old_col, key) in self.cols.iter().enumerate() {
            if let Some(new_col) = cols.iter().position(|c| c == key) {
                for row in 0..self.rows.len() {
                    cells[row * cols.len() + new_col] = self.cells[row * self.cols.len() + old_col];
                }
            }
        }
        self.cols = cols;
        self.cells = cells;
    }

    /// Emit shape, totals and minimum cell through `tracing`.
    pub fn log_summary(&self) {
        let (rows, cols) = self.shape();
        info!("Contingency table shape: {} x {}", rows, cols);
        info!("Total entries: {}", self.grand_total());

        let mut row_totals: Vec<(&String, u64)> = self.rows.iter().zip(self.row_totals()).collect();
        row_totals.sort_by(|a, b| b.1.cmp(&a.1));
        info!("Row totals (entity visits):");
        for (row, total) in row_totals {
            info!("  {}: {}", row, total);
        }

        let mut col_totals: Vec<(&String, u64)> = self.cols.iter().zip(self.col_totals()).collect();
        col_totals.sort_by(|a, b| b.1.cmp(&a.1));
        info!("Column totals (group visits):");
        for (col, total) in col_totals {
            info!("  {}: {}", col, total);
        }

        if let Some(min) = self.min_cell() {
            info!("Minimum cell count: {}", min);
        }
    }
}

/// Builds contingency tables from session tables.
#[derive(Debug, Clone, Default)]
pub struct ContingencyAggregator {
    quality: QualityConfig,
}

impl ContingencyAggregator {
    pub fn new(quality: QualityConfig) -> Self {
        Self { quality }
    }

    /// Cross-tabulate `table` by `rule`.
    ///
    /// Emits a `warn!` when the table is sparse; the table is returned
    /// either way.
    pub fn aggregate<G: GroupingRule + ?Sized>(&self, table: &SessionTable, rule: &G) -> ContingencyTable {
        let contingency = tabulate(table, 0..table.len(), rule);
        self.check_quality(&contingency, rule.name());
        contingency
    }

    /// Cross-tabulate on the rayon pool, merging per-chunk partial tables.
    ///
    /// Produces the same table as `aggregate`.
    pub fn aggregate_parallel<G: GroupingRule + Sync + ?Sized>(
        &self,
        table: &SessionTable,
        rule: &G,
        chunk_size: usize,
    ) -> ContingencyTable {
        let chunk_size = chunk_size.max(1);
        let num_chunks = table.len().div_ceil(chunk_size);

        let contingency = (0..num_chunks)
            .into_par_iter()
            .map(|chunk| {
                let start = chunk * chunk_size;
                let end = (start + chunk_size).min(table.len());
                tabulate(table, start..end, rule)
            })
            .reduce(
                || ContingencyTable::zeros(table.entity_ids.clone(), Vec::new()),
                |mut acc, part| {
                    acc.merge(&part);
                    acc
                },
            );

        self.check_quality(&contingency, rule.name());
        contingency
    }

    fn check_quality(&self, table: &ContingencyTable, rule_name: &str) {
        if let Some(warning) = table.quality_warning(self.quality.min_cell_count) {
            warn!(
                grouping = rule_name,
                min_cell = warning.min_cell,
                low_cells = warning.low_cells,
                "Some cells have very low counts (<{}), which may affect analysis quality",
                warning.threshold
            );
        }
    }
}

/// Tabulate the sessions in `range`.
fn tabulate<G: GroupingRule + ?Sized>(
    table: &SessionTable,
    range: std::ops::Range<usize>,
    rule: &G,
) -> ContingencyTable {
    let sessions = &table.sessions[range];
    let keys: Vec<GroupKey> = sessions.iter().map(|s| rule.group_key(s)).collect();

    let cols: Vec<GroupKey> = keys.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
    let col_index: HashMap<GroupKey, usize> = cols.iter().cloned().enumerate().map(|(i, c)| (c, i)).collect();

    let mut contingency = ContingencyTable::zeros(table.entity_ids.clone(), cols);
    let width = contingency.cols.len();
    let num_rows = contingency.rows.len();

    for (session, key) in sessions.iter().zip(keys.iter()) {
        let col = col_index[key];
        for row in session.visits.visited_indices().filter(|&r| r < num_rows) {
            contingency.cells[row * width + col] += 1;
        }
    }

    contingency
}
