// Error types shared by every board operation.

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BoardError>;

/// The kind of record a lookup failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Player,
    Team,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Player => write!(f, "player"),
            Entity::Team => write!(f, "team"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },

    #[error("player {player_id} has already been drafted")]
    AlreadyDrafted { player_id: i64 },

    #[error("teams already initialized ({existing} exist); clear teams first")]
    AlreadyInitialized { existing: usize },

    #[error("invalid `{field}`: {message}")]
    InvalidArgument { field: String, message: String },

    #[error("team {team_id} cannot afford ${price} (remaining ${remaining})")]
    InsufficientBudget {
        team_id: i64,
        price: u32,
        remaining: u32,
    },

    #[error("team name `{name}` already exists")]
    DuplicateName { name: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Transport-facing classification of a [`BoardError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    AlreadyDrafted,
    AlreadyInitialized,
    InvalidArgument,
    InsufficientBudget,
    DuplicateName,
    Storage,
}

impl BoardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BoardError::NotFound { .. } => ErrorKind::NotFound,
            BoardError::AlreadyDrafted { .. } => ErrorKind::AlreadyDrafted,
            BoardError::AlreadyInitialized { .. } => ErrorKind::AlreadyInitialized,
            BoardError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            BoardError::InsufficientBudget { .. } => ErrorKind::InsufficientBudget,
            BoardError::DuplicateName { .. } => ErrorKind::DuplicateName,
            BoardError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn player_not_found(id: i64) -> Self {
        BoardError::NotFound {
            entity: Entity::Player,
            id,
        }
    }

    pub(crate) fn team_not_found(id: i64) -> Self {
        BoardError::NotFound {
            entity: Entity::Team,
            id,
        }
    }

    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        BoardError::InvalidArgument {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
