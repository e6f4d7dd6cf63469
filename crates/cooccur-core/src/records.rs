//! Flat comma-separated record files.
//!
//! Raw dataset: `actor_id,segment,<entity>...` with one 0/1 column per
//! entity; the analysis variant omits `segment`. Contingency table:
//! `entity,<group>...` with one row per entity.
//!
//! Ids and labels are validated to contain no commas, quotes or line
//! breaks, so fields are written and read without quoting.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::contingency::ContingencyTable;
use crate::error::{CooccurError, CooccurResult};
use crate::session::{Session, SessionTable, VisitVector};

pub const ACTOR_ID_COLUMN: &str = "actor_id";
pub const SEGMENT_COLUMN: &str = "segment";
pub const ENTITY_COLUMN: &str = "entity";

/// Point-size column some tables carry for plotting; never an entity.
const IGNORED_COLUMNS: &[&str] = &["size"];

/// Write a raw session table.
pub fn write_sessions(path: &Path, table: &SessionTable, include_segment: bool) -> CooccurResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    let mut header = vec![ACTOR_ID_COLUMN];
    if include_segment {
        header.push(SEGMENT_COLUMN);
    }
    header.extend(table.entity_ids.iter().map(String::as_str));
    writeln!(writer, "{}", header.join(","))?;

    for session in &table.sessions {
        write!(writer, "{}", session.actor_id)?;
        if include_segment {
            write!(writer, ",{}", session.segment_id)?;
        }
        for flag in session.visits.as_binary() {
            write!(writer, ",{}", flag)?;
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the labeled dataset to `path` and the unlabeled analysis variant
/// to `<stem>_for_analysis.<ext>` next to it. Returns the second path.
pub fn write_dataset_variants(path: &Path, table: &SessionTable) -> CooccurResult<PathBuf> {
    write_sessions(path, table, true)?;
    info!("Dataset saved to '{}'", path.display());

    let analysis_path = analysis_variant_path(path);
    write_sessions(&analysis_path, table, false)?;
    info!("Analysis version saved to '{}'", analysis_path.display());

    Ok(analysis_path)
}

/// `data/visits.csv` -> `data/visits_for_analysis.csv`.
pub fn analysis_variant_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_for_analysis.{}", stem, ext.to_string_lossy()),
        None => format!("{}_for_analysis", stem),
    };
    path.with_file_name(name)
}

/// Read a labeled raw session table.
///
/// Fails with `NotFound` when the file is missing and with `Schema` when
/// the actor-id or segment column is absent, no entity columns remain,
/// a row has the wrong number of fields or a visit cell is not 0/1.
pub fn read_sessions(path: &Path) -> CooccurResult<SessionTable> {
    if !path.exists() {
        return Err(CooccurError::not_found(path));
    }

    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();

    let header_line = match lines.next() {
        Some(line) => line?,
        None => return Err(CooccurError::schema(path, "file is empty")),
    };
    let header: Vec<&str> = header_line.split(',').map(str::trim).collect();

    let column = |name: &str| {
        header
            .iter()
            .position(|h| *h == name)
            .ok_or_else(|| CooccurError::schema(path, format!("missing column '{}'", name)))
    };
    let actor_col = column(ACTOR_ID_COLUMN)?;
    let segment_col = column(SEGMENT_COLUMN)?;

    let entity_cols: Vec<usize> = (0..header.len())
        .filter(|&c| c != actor_col && c != segment_col && !IGNORED_COLUMNS.contains(&header[c]))
        .collect();
    if entity_cols.is_empty() {
        return Err(CooccurError::schema(path, "no entity columns"));
    }
    let entity_ids: Vec<String> = entity_cols.iter().map(|&c| header[c].to_string()).collect();

    let mut sessions = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        // Header is line 1.
        let row = line_no + 2;
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != header.len() {
            return Err(CooccurError::schema(
                path,
                format!("line {}: expected {} fields, found {}", row, header.len(), fields.len()),
            ));
        }

        let mut flags = Vec::with_capacity(entity_cols.len());
        for &c in &entity_cols {
            let flag = match fields[c] {
                "0" => false,
                "1" => true,
                other => {
                    return Err(CooccurError::schema(
                        path,
                        format!("line {}: column '{}' must be 0 or 1, found '{}'", row, header[c], other),
                    ))
                }
            };
            flags.push(flag);
        }

        sessions.push(Session {
            actor_id: fields[actor_col].to_string(),
            segment_id: fields[segment_col].to_string(),
            visits: VisitVector::from_flags(flags),
        });
    }

    info!("Loaded {} sessions from '{}'", sessions.len(), path.display());
    Ok(SessionTable::new(entity_ids, sessions))
}

/// Write a contingency table with entity ids as the leading column.
pub fn write_contingency(path: &Path, table: &ContingencyTable) -> CooccurResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    let mut header = vec![ENTITY_COLUMN];
    header.extend(table.cols().iter().map(String::as_str));
    writeln!(writer, "{}", header.join(","))?;

    for (r, row) in table.rows().iter().enumerate() {
        write!(writer, "{}", row)?;
        for value in table.row_values(r) {
            write!(writer, ",{}", value)?;
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}
