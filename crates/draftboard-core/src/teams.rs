// Team store: teams, their fixed budgets, and rosters derived from the player
// table on every read.

use std::collections::HashMap;
use std::sync::Arc;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::{BoardError, Result};
use crate::model::{Player, Team};
use crate::players;

/// Default number of teams in a league.
pub const DEFAULT_TEAM_COUNT: usize = 12;

/// Most teams a single league may hold.
pub const MAX_TEAM_COUNT: usize = 64;

/// Default auction budget per team.
pub const DEFAULT_BUDGET: u32 = 200;

/// A team row as stored, before roster and budget figures are attached.
#[derive(Debug, Clone)]
pub(crate) struct TeamRow {
    pub id: i64,
    pub name: String,
    pub budget: u32,
}

#[derive(Clone)]
pub struct TeamStore {
    db: Arc<Database>,
}

impl TeamStore {
    pub fn new(db: Arc<Database>) -> Self {
        TeamStore { db }
    }

    /// Create `count` teams named "Team 1".."Team N", each with
    /// `default_budget`. Fails if any team already exists.
    pub fn initialize(&self, count: usize, default_budget: u32) -> Result<Vec<Team>> {
        if count == 0 {
            return Err(BoardError::invalid("count", "must be greater than 0"));
        }
        if count > MAX_TEAM_COUNT {
            return Err(BoardError::invalid(
                "count",
                format!("must be at most {MAX_TEAM_COUNT}"),
            ));
        }
        if default_budget == 0 {
            return Err(BoardError::invalid("budget", "must be greater than 0"));
        }

        let teams = self.db.write(|tx| {
            let existing: i64 = tx.query_row("SELECT COUNT(*) FROM teams", [], |row| row.get(0))?;
            if existing > 0 {
                return Err(BoardError::AlreadyInitialized {
                    existing: existing as usize,
                });
            }

            let mut stmt = tx.prepare("INSERT INTO teams (name, budget) VALUES (?1, ?2)")?;
            for i in 1..=count {
                stmt.execute(params![format!("Team {i}"), default_budget])?;
            }
            drop(stmt);

            load_annotated(tx)
        })?;

        info!(
            "Initialized {} teams with ${} budget each",
            teams.len(),
            default_budget
        );
        Ok(teams)
    }

    /// All teams in creation order with rosters, spent and remaining budget.
    pub fn list(&self) -> Result<Vec<Team>> {
        let teams = self.db.read(load_annotated)?;
        debug!("Listed {} teams", teams.len());
        Ok(teams)
    }

    pub fn get(&self, team_id: i64) -> Result<Team> {
        self.db.read(|conn| {
            let row = find(conn, team_id)?.ok_or_else(|| BoardError::team_not_found(team_id))?;
            let roster = roster_of(conn, team_id)?;
            Ok(annotate(row, roster))
        })
    }

    /// Change a team's display name. The trimmed name must be non-empty and
    /// not used by another team.
    pub fn rename(&self, team_id: i64, new_name: &str) -> Result<Team> {
        let name = new_name.trim();
        if name.is_empty() {
            return Err(BoardError::invalid("name", "must not be empty"));
        }

        let team = self.db.write(|tx| {
            let row = find(tx, team_id)?.ok_or_else(|| BoardError::team_not_found(team_id))?;

            tx.execute(
                "UPDATE teams SET name = ?1 WHERE id = ?2",
                params![name, team_id],
            )
            .map_err(|err| map_unique_name(err, name))?;

            let roster = roster_of(tx, team_id)?;
            Ok(annotate(
                TeamRow {
                    name: name.to_string(),
                    ..row
                },
                roster,
            ))
        })?;

        info!("Renamed team {} to '{}'", team_id, team.name);
        Ok(team)
    }

    /// Delete every team after returning every drafted player to the
    /// available pool.
    pub fn clear_all(&self) -> Result<usize> {
        let (undrafted, removed) = self.db.write(|tx| {
            let undrafted = players::undraft_all(tx)?;
            let removed = tx.execute("DELETE FROM teams", [])?;
            Ok((undrafted, removed))
        })?;

        info!(
            "Cleared {} teams and returned {} players to the pool",
            removed, undrafted
        );
        Ok(removed)
    }

    /// Whether `team_id` has at least `price` left to spend.
    pub fn affordability_check(&self, team_id: i64, price: u32) -> Result<bool> {
        self.db.read(|conn| {
            let row = find(conn, team_id)?.ok_or_else(|| BoardError::team_not_found(team_id))?;
            can_afford(conn, &row, price)
        })
    }
}

// ---------------------------------------------------------------------------
// Connection-level helpers
// ---------------------------------------------------------------------------

pub(crate) fn find(conn: &Connection, team_id: i64) -> Result<Option<TeamRow>> {
    let row = conn
        .query_row(
            "SELECT id, name, budget FROM teams WHERE id = ?1",
            params![team_id],
            |row| {
                Ok(TeamRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    budget: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Total price paid for the team's roster.
pub(crate) fn spent(conn: &Connection, team_id: i64) -> Result<u32> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(draft_price), 0) FROM players WHERE drafted_by = ?1",
        params![team_id],
        |row| row.get(0),
    )?;
    Ok(u32::try_from(total).unwrap_or(u32::MAX))
}

pub(crate) fn remaining_budget(conn: &Connection, team: &TeamRow) -> Result<u32> {
    Ok(team.budget.saturating_sub(spent(conn, team.id)?))
}

/// Whether the team has at least `price` left to spend.
pub(crate) fn can_afford(conn: &Connection, team: &TeamRow, price: u32) -> Result<bool> {
    Ok(price <= remaining_budget(conn, team)?)
}

fn roster_of(conn: &Connection, team_id: i64) -> Result<Vec<Player>> {
    players::load_roster(conn, team_id)
}

fn load_annotated(conn: &Connection) -> Result<Vec<Team>> {
    let mut stmt = conn.prepare("SELECT id, name, budget FROM teams ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(TeamRow {
                id: row.get(0)?,
                name: row.get(1)?,
                budget: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut rosters: HashMap<i64, Vec<Player>> = HashMap::new();
    for player in players::load_drafted(conn)? {
        if let Some(team_id) = player.drafted_by {
            rosters.entry(team_id).or_default().push(player);
        }
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let roster = rosters.remove(&row.id).unwrap_or_default();
            annotate(row, roster)
        })
        .collect())
}

fn annotate(row: TeamRow, players: Vec<Player>) -> Team {
    let spent: u32 = players
        .iter()
        .filter_map(|p| p.draft_price)
        .fold(0u32, |acc, price| acc.saturating_add(price));
    if spent > row.budget {
        warn!(
            "Team {} has spent ${} of a ${} budget",
            row.id, spent, row.budget
        );
    }
    Team {
        id: row.id,
        name: row.name,
        budget: row.budget,
        spent,
        remaining_budget: row.budget.saturating_sub(spent),
        players,
    }
}

fn map_unique_name(err: rusqlite::Error, name: &str) -> BoardError {
    if matches!(err.sqlite_error_code(), Some(ErrorCode::ConstraintViolation)) {
        BoardError::DuplicateName {
            name: name.to_string(),
        }
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewPlayer;
    use crate::players::PlayerStore;

    fn test_stores() -> (PlayerStore, TeamStore) {
        let db = Arc::new(Database::open(":memory:").expect("in-memory database should open"));
        (PlayerStore::new(db.clone()), TeamStore::new(db))
    }

    fn seed_players(players: &PlayerStore) -> Vec<i64> {
        players
            .replace_all(&[
                NewPlayer::new("A", "QB", "KC"),
                NewPlayer::new("B", "RB", "SF"),
                NewPlayer::new("C", "WR", "MIA"),
            ])
            .unwrap();
        players.list().unwrap().iter().map(|p| p.id).collect()
    }

    #[test]
    fn initialize_creates_named_teams_with_budget() {
        let (_, teams) = test_stores();
        let created = teams.initialize(DEFAULT_TEAM_COUNT, DEFAULT_BUDGET).unwrap();
        assert_eq!(created.len(), 12);
        assert_eq!(created[0].name, "Team 1");
        assert_eq!(created[11].name, "Team 12");
        assert!(created.iter().all(|t| t.budget == 200
            && t.spent == 0
            && t.remaining_budget == 200
            && t.players.is_empty()));
        assert_eq!(teams.list().unwrap(), created);
    }

    #[test]
    fn initialize_twice_fails() {
        let (_, teams) = test_stores();
        teams.initialize(4, 100).unwrap();
        let err = teams.initialize(4, 100).unwrap_err();
        assert!(matches!(err, BoardError::AlreadyInitialized { existing: 4 }));
        assert_eq!(teams.list().unwrap().len(), 4);
    }

    #[test]
    fn initialize_rejects_zero_count_or_budget() {
        let (_, teams) = test_stores();
        assert!(matches!(
            teams.initialize(0, 200),
            Err(BoardError::InvalidArgument { .. })
        ));
        assert!(matches!(
            teams.initialize(12, 0),
            Err(BoardError::InvalidArgument { .. })
        ));
        assert!(teams.list().unwrap().is_empty());
    }

    #[test]
    fn initialize_rejects_count_above_maximum() {
        let (_, teams) = test_stores();
        let err = teams.initialize(MAX_TEAM_COUNT + 1, 200).unwrap_err();
        assert!(matches!(&err, BoardError::InvalidArgument { field, .. } if field == "count"));
        assert!(teams.list().unwrap().is_empty());

        let err = teams.initialize(4_000_000_000, 200).unwrap_err();
        assert!(matches!(err, BoardError::InvalidArgument { .. }));

        assert_eq!(teams.initialize(MAX_TEAM_COUNT, 200).unwrap().len(), MAX_TEAM_COUNT);
    }

    #[test]
    fn list_annotates_rosters_and_budgets() {
        let (players, teams) = test_stores();
        let ids = seed_players(&players);
        let created = teams.initialize(2, 200).unwrap();

        players.mark_drafted(ids[0], 50, created[0].id).unwrap();
        players.mark_drafted(ids[2], 25, created[0].id).unwrap();
        players.mark_drafted(ids[1], 10, created[1].id).unwrap();

        let listed = teams.list().unwrap();
        assert_eq!(listed[0].spent, 75);
        assert_eq!(listed[0].remaining_budget, 125);
        let names: Vec<&str> = listed[0].players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(listed[1].spent, 10);
        assert_eq!(listed[1].remaining_budget, 190);
    }

    #[test]
    fn get_returns_single_team_or_not_found() {
        let (players, teams) = test_stores();
        let ids = seed_players(&players);
        let created = teams.initialize(2, 200).unwrap();
        players.mark_drafted(ids[1], 30, created[1].id).unwrap();

        let team = teams.get(created[1].id).unwrap();
        assert_eq!(team.name, "Team 2");
        assert_eq!(team.remaining_budget, 170);
        assert_eq!(team.players.len(), 1);

        assert!(matches!(
            teams.get(12345),
            Err(BoardError::NotFound { id: 12345, .. })
        ));
    }

    #[test]
    fn rename_trims_and_persists() {
        let (_, teams) = test_stores();
        let created = teams.initialize(2, 200).unwrap();
        let renamed = teams.rename(created[0].id, "  Gridiron Gang ").unwrap();
        assert_eq!(renamed.name, "Gridiron Gang");
        assert_eq!(teams.get(created[0].id).unwrap().name, "Gridiron Gang");
    }

    #[test]
    fn rename_rejects_blank_unknown_and_duplicate() {
        let (_, teams) = test_stores();
        let created = teams.initialize(2, 200).unwrap();

        assert!(matches!(
            teams.rename(created[0].id, "   "),
            Err(BoardError::InvalidArgument { .. })
        ));
        assert!(matches!(
            teams.rename(999, "Anything"),
            Err(BoardError::NotFound { .. })
        ));
        assert!(matches!(
            teams.rename(created[0].id, "Team 2"),
            Err(BoardError::DuplicateName { .. })
        ));
        assert_eq!(teams.get(created[0].id).unwrap().name, "Team 1");
    }

    #[test]
    fn rename_to_own_name_is_allowed() {
        let (_, teams) = test_stores();
        let created = teams.initialize(1, 200).unwrap();
        assert_eq!(teams.rename(created[0].id, "Team 1").unwrap().name, "Team 1");
    }

    #[test]
    fn clear_all_undrafts_players_and_removes_teams() {
        let (players, teams) = test_stores();
        let ids = seed_players(&players);
        let created = teams.initialize(3, 200).unwrap();
        players.mark_drafted(ids[0], 40, created[0].id).unwrap();
        players.mark_drafted(ids[1], 20, created[2].id).unwrap();

        assert_eq!(teams.clear_all().unwrap(), 3);
        assert!(teams.list().unwrap().is_empty());

        let all = players.list().unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|p| !p.drafted
            && p.draft_price.is_none()
            && p.drafted_by.is_none()
            && p.drafted_at.is_none()));

        // Teams can be initialized again afterwards.
        assert_eq!(teams.initialize(2, 150).unwrap().len(), 2);
    }

    #[test]
    fn affordability_check_compares_against_remaining() {
        let (players, teams) = test_stores();
        let ids = seed_players(&players);
        let created = teams.initialize(1, 200).unwrap();
        let team_id = created[0].id;
        players.mark_drafted(ids[0], 50, team_id).unwrap();

        assert!(teams.affordability_check(team_id, 150).unwrap());
        assert!(!teams.affordability_check(team_id, 151).unwrap());
        assert!(teams.affordability_check(team_id, 0).unwrap());
        assert!(matches!(
            teams.affordability_check(77, 1),
            Err(BoardError::NotFound { .. })
        ));
    }
}
