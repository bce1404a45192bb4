// Player and team records as the board exposes them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Football roster positions.
///
/// The set is open: any code outside the recognised ones is kept verbatim
/// (upper-cased) as [`Position::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Position {
    Quarterback,
    RunningBack,
    WideReceiver,
    TightEnd,
    Kicker,
    Defense,
    Other(String),
}

impl Position {
    /// Parse a position code.
    ///
    /// Handles the common spellings of team defense ("DST", "D/ST", "DEF").
    pub fn from_code(s: &str) -> Self {
        let code = s.trim().to_uppercase();
        match code.as_str() {
            "QB" => Position::Quarterback,
            "RB" => Position::RunningBack,
            "WR" => Position::WideReceiver,
            "TE" => Position::TightEnd,
            "K" | "PK" => Position::Kicker,
            "DST" | "D/ST" | "DEF" => Position::Defense,
            _ => Position::Other(code),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Kicker => "K",
            Position::Defense => "DST",
            Position::Other(code) => code.as_str(),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<String> for Position {
    fn from(s: String) -> Self {
        Position::from_code(&s)
    }
}

impl From<Position> for String {
    fn from(p: Position) -> Self {
        p.code().to_string()
    }
}

/// A player on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub position: Position,
    /// NFL team abbreviation.
    pub team: String,
    pub projected_points: Option<f64>,
    pub drafted: bool,
    pub draft_price: Option<u32>,
    /// Id of the fantasy team that drafted this player.
    pub drafted_by: Option<i64>,
    pub drafted_at: Option<DateTime<Utc>>,
}

impl Player {
    /// `drafted` is true exactly when both the price and the drafting team
    /// are recorded.
    pub fn is_consistent(&self) -> bool {
        self.drafted == (self.draft_price.is_some() && self.drafted_by.is_some())
            && self.draft_price.is_some() == self.drafted_by.is_some()
    }
}

/// A fantasy team with its roster and budget figures recomputed from the
/// player table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
    /// Total budget, fixed when the team is created.
    pub budget: u32,
    pub spent: u32,
    pub remaining_budget: u32,
    pub players: Vec<Player>,
}

/// A candidate player row handed to [`crate::players::PlayerStore::replace_all`].
/// Nothing about it is validated yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPlayer {
    pub name: String,
    pub position: String,
    pub team: String,
    #[serde(default)]
    pub projected_points: Option<f64>,
}

impl NewPlayer {
    pub fn new(name: &str, position: &str, team: &str) -> Self {
        NewPlayer {
            name: name.to_string(),
            position: position.to_string(),
            team: team.to_string(),
            projected_points: None,
        }
    }

    pub fn with_projection(mut self, points: f64) -> Self {
        self.projected_points = Some(points);
        self
    }
}

/// Outcome of replacing the player set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceSummary {
    pub inserted: usize,
    pub skipped: usize,
}
