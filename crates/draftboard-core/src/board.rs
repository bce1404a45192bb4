// The draft board session: owns both stores and exposes every operation.

use std::io::Read;
use std::sync::Arc;

use crate::db::Database;
use crate::draft::{self, DraftRequest};
use crate::error::Result;
use crate::ingest::{self, IngestSummary, RawRow};
use crate::model::{Player, Team};
use crate::players::PlayerStore;
use crate::teams::TeamStore;

/// One draft session. Share it across tasks or threads as `Arc<Board>`.
pub struct Board {
    db: Arc<Database>,
    players: PlayerStore,
    teams: TeamStore,
}

impl Board {
    pub fn new(db: Database) -> Self {
        let db = Arc::new(db);
        Board {
            players: PlayerStore::new(db.clone()),
            teams: TeamStore::new(db.clone()),
            db,
        }
    }

    /// Open a board backed by the SQLite file at `path`.
    pub fn open(path: &str) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    pub fn players(&self) -> &PlayerStore {
        &self.players
    }

    pub fn teams(&self) -> &TeamStore {
        &self.teams
    }

    pub fn draft(&self, request: &DraftRequest) -> Result<Player> {
        draft::execute(&self.db, request)
    }

    pub fn ingest_rows(&self, rows: &[RawRow]) -> Result<IngestSummary> {
        ingest::ingest_rows(&self.players, rows)
    }

    pub fn ingest_csv<R: Read>(&self, rdr: R) -> Result<IngestSummary> {
        ingest::ingest_csv(&self.players, rdr)
    }

    pub fn list_players(&self) -> Result<Vec<Player>> {
        self.players.list()
    }

    pub fn list_teams(&self) -> Result<Vec<Team>> {
        self.teams.list()
    }
}
