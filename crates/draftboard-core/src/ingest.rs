// Bulk ingest: replace the player set from loosely typed tabular rows.
//
// Header names are matched case-insensitively. Rows keep flowing even when
// individual ones are malformed; the player store counts and skips them.

use std::collections::HashMap;
use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BoardError, Result};
use crate::model::NewPlayer;
use crate::players::PlayerStore;

/// One row from an external tabular source, keyed by its header names.
pub type RawRow = HashMap<String, String>;

/// The canonical player fields a header can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Position,
    Team,
    ProjectedPoints,
}

/// Outcome of a bulk ingest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub total_rows: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// Map a header to its canonical field and the alias rank within that field.
/// Spaces and hyphens fold to underscores, so "Projected Points" and
/// "projected-points" both match. Rank 0 is the canonical name.
fn canonical_field(header: &str) -> Option<(Field, usize)> {
    let key: String = header
        .trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect();

    let (field, rank) = match key.as_str() {
        "name" => (Field::Name, 0),
        "player" => (Field::Name, 1),
        "player_name" => (Field::Name, 2),
        "position" => (Field::Position, 0),
        "pos" => (Field::Position, 1),
        "team" => (Field::Team, 0),
        "nfl_team" => (Field::Team, 1),
        "projected_points" => (Field::ProjectedPoints, 0),
        "projected_score" => (Field::ProjectedPoints, 1),
        "projection" => (Field::ProjectedPoints, 2),
        "points" => (Field::ProjectedPoints, 3),
        _ => return None,
    };
    Some((field, rank))
}

/// Convert a raw row into a candidate player. Required fields that are absent
/// come through blank, which the player store treats as a skip.
///
/// When several headers alias one field, the lowest-ranked alias wins
/// regardless of column order.
fn row_to_player(row: &RawRow) -> NewPlayer {
    let mut best: [Option<(usize, &str)>; 4] = [None; 4];

    for (header, value) in row {
        let Some((field, rank)) = canonical_field(header) else {
            continue;
        };
        let slot = &mut best[field as usize];
        if slot.map_or(true, |(current, _)| rank < current) {
            *slot = Some((rank, value.trim()));
        }
    }

    let text = |field: Field| best[field as usize].map_or("", |(_, v)| v).to_string();
    NewPlayer {
        name: text(Field::Name),
        position: text(Field::Position),
        team: text(Field::Team),
        projected_points: best[Field::ProjectedPoints as usize]
            .and_then(|(_, v)| parse_projection(v)),
    }
}

/// A projection is kept only if it is a finite, non-negative number.
fn parse_projection(value: &str) -> Option<f64> {
    if value.is_empty() {
        return None;
    }
    match value.parse::<f64>() {
        Ok(points) if points.is_finite() && points >= 0.0 => Some(points),
        _ => {
            warn!("ignoring projection '{}': not a non-negative number", value);
            None
        }
    }
}

/// Replace every player with the contents of `rows`.
///
/// This is total, not a merge: all prior players, and with them every roster,
/// are discarded first.
pub fn ingest_rows(store: &PlayerStore, rows: &[RawRow]) -> Result<IngestSummary> {
    let records: Vec<NewPlayer> = rows.iter().map(row_to_player).collect();
    let replaced = store.replace_all(&records)?;

    let summary = IngestSummary {
        total_rows: rows.len(),
        inserted: replaced.inserted,
        skipped: replaced.skipped,
    };
    info!(
        "Ingested {} rows: {} inserted, {} skipped",
        summary.total_rows, summary.inserted, summary.skipped
    );
    Ok(summary)
}

/// Read CSV text into header-keyed rows.
///
/// Short rows are tolerated (the missing cells are simply absent); input that
/// is not valid CSV or not UTF-8 is rejected as a whole.
pub fn read_csv_rows<R: Read>(rdr: R) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(rdr);

    let headers = reader
        .headers()
        .map_err(|e| BoardError::invalid("csv", e.to_string()))?
        .clone();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| BoardError::invalid("csv", e.to_string()))?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Parse CSV text and ingest it.
pub fn ingest_csv<R: Read>(store: &PlayerStore, rdr: R) -> Result<IngestSummary> {
    let rows = read_csv_rows(rdr)?;
    ingest_rows(store, &rows)
}
