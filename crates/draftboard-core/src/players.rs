// Player store: the canonical player records and their draft status.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::{BoardError, Result};
use crate::model::{NewPlayer, Player, Position, ReplaceSummary};

const PLAYER_COLUMNS: &str =
    "id, name, position, team, projected_points, drafted, draft_price, drafted_by, drafted_at";

/// Owns the player set. Cloning is cheap and every clone shares the same
/// database.
#[derive(Clone)]
pub struct PlayerStore {
    db: Arc<Database>,
}

impl PlayerStore {
    pub fn new(db: Arc<Database>) -> Self {
        PlayerStore { db }
    }

    /// All players in ingest order.
    pub fn list(&self) -> Result<Vec<Player>> {
        let players = self.db.read(load_all)?;
        debug!("Listed {} players", players.len());
        Ok(players)
    }

    pub fn get(&self, player_id: i64) -> Result<Player> {
        self.db
            .read(|conn| find(conn, player_id))?
            .ok_or_else(|| BoardError::player_not_found(player_id))
    }

    /// Discard every player and insert `records` as the new, undrafted set.
    ///
    /// Records with a blank name, position or team are skipped and counted
    /// rather than failing the batch.
    pub fn replace_all(&self, records: &[NewPlayer]) -> Result<ReplaceSummary> {
        let summary = self.db.write(|tx| {
            let removed = tx.execute("DELETE FROM players", [])?;
            debug!("Removed {} previous players", removed);

            let mut summary = ReplaceSummary::default();
            let mut stmt = tx.prepare(
                "INSERT INTO players (name, position, team, projected_points)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;

            for (idx, record) in records.iter().enumerate() {
                match validate(record) {
                    Ok(valid) => {
                        stmt.execute(params![
                            valid.name,
                            valid.position.code(),
                            valid.team,
                            valid.projected_points,
                        ])?;
                        summary.inserted += 1;
                    }
                    Err(reason) => {
                        warn!("skipping player row {}: {}", idx + 1, reason);
                        summary.skipped += 1;
                    }
                }
            }
            Ok(summary)
        })?;

        info!(
            "Replaced player set: {} inserted, {} skipped",
            summary.inserted, summary.skipped
        );
        Ok(summary)
    }

    /// Mark a player drafted by `team_id` at `price`.
    ///
    /// This performs no budget check; [`crate::draft::execute`] is the
    /// budget-aware entry point.
    pub fn mark_drafted(&self, player_id: i64, price: u32, team_id: i64) -> Result<Player> {
        let player = self.db.write(|tx| {
            ensure_draftable(tx, player_id)?;
            if !team_exists(tx, team_id)? {
                return Err(BoardError::team_not_found(team_id));
            }
            set_drafted(tx, player_id, price, team_id)
        })?;
        info!(
            "Player {} ({}) drafted by team {} for ${}",
            player.id, player.name, team_id, price
        );
        Ok(player)
    }

    /// Delete every player. Rosters empty as a consequence.
    pub fn clear_all(&self) -> Result<usize> {
        let removed = self
            .db
            .write(|tx| Ok(tx.execute("DELETE FROM players", [])?))?;
        info!("Cleared {} players", removed);
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

struct ValidPlayer {
    name: String,
    position: Position,
    team: String,
    projected_points: Option<f64>,
}

fn validate(record: &NewPlayer) -> std::result::Result<ValidPlayer, String> {
    let name = record.name.trim();
    let position = record.position.trim();
    let team = record.team.trim();

    if name.is_empty() {
        return Err("missing name".into());
    }
    if position.is_empty() {
        return Err(format!("missing position for '{name}'"));
    }
    if team.is_empty() {
        return Err(format!("missing team for '{name}'"));
    }

    let projected_points = record
        .projected_points
        .filter(|p| p.is_finite() && *p >= 0.0);

    Ok(ValidPlayer {
        name: name.to_string(),
        position: Position::from_code(position),
        team: team.to_string(),
        projected_points,
    })
}

// ---------------------------------------------------------------------------
// Connection-level helpers shared with the team store and draft operation
// ---------------------------------------------------------------------------

pub(crate) fn player_from_row(row: &Row<'_>) -> rusqlite::Result<Player> {
    let position: String = row.get(2)?;
    Ok(Player {
        id: row.get(0)?,
        name: row.get(1)?,
        position: Position::from_code(&position),
        team: row.get(3)?,
        projected_points: row.get(4)?,
        drafted: row.get(5)?,
        draft_price: row.get(6)?,
        drafted_by: row.get(7)?,
        drafted_at: row.get(8)?,
    })
}

pub(crate) fn load_all(conn: &Connection) -> Result<Vec<Player>> {
    let mut stmt = conn.prepare(&format!("SELECT {PLAYER_COLUMNS} FROM players ORDER BY id"))?;
    let players = stmt
        .query_map([], player_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(players)
}

/// Every drafted player, ordered by id. Used to build rosters.
pub(crate) fn load_drafted(conn: &Connection) -> Result<Vec<Player>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PLAYER_COLUMNS} FROM players WHERE drafted_by IS NOT NULL ORDER BY id"
    ))?;
    let players = stmt
        .query_map([], player_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(players)
}

/// Players drafted by one team, ordered by id.
pub(crate) fn load_roster(conn: &Connection, team_id: i64) -> Result<Vec<Player>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PLAYER_COLUMNS} FROM players WHERE drafted_by = ?1 ORDER BY id"
    ))?;
    let players = stmt
        .query_map(params![team_id], player_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(players)
}

pub(crate) fn find(conn: &Connection, player_id: i64) -> Result<Option<Player>> {
    let player = conn
        .query_row(
            &format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?1"),
            params![player_id],
            player_from_row,
        )
        .optional()?;
    Ok(player)
}

/// Load a player that is still available, failing with `NotFound` or
/// `AlreadyDrafted` otherwise.
pub(crate) fn ensure_draftable(conn: &Connection, player_id: i64) -> Result<Player> {
    let player = find(conn, player_id)?.ok_or_else(|| BoardError::player_not_found(player_id))?;
    if player.drafted {
        warn!("Rejected re-draft of player {} ({})", player.id, player.name);
        return Err(BoardError::AlreadyDrafted { player_id });
    }
    Ok(player)
}

pub(crate) fn set_drafted(
    conn: &Connection,
    player_id: i64,
    price: u32,
    team_id: i64,
) -> Result<Player> {
    conn.execute(
        "UPDATE players
            SET drafted = 1, draft_price = ?1, drafted_by = ?2, drafted_at = ?3
          WHERE id = ?4 AND drafted = 0",
        params![price, team_id, Utc::now(), player_id],
    )?;
    find(conn, player_id)?.ok_or_else(|| BoardError::player_not_found(player_id))
}

/// Reset the draft fields of every drafted player. Returns how many changed.
pub(crate) fn undraft_all(conn: &Connection) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE players
            SET drafted = 0, draft_price = NULL, drafted_by = NULL, drafted_at = NULL
          WHERE drafted = 1",
        [],
    )?;
    Ok(changed)
}

fn team_exists(conn: &Connection, team_id: i64) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM teams WHERE id = ?1)",
        params![team_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}
