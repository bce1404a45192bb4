// The draft transition: Available -> Drafted, bound to a team at a price.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{BoardError, Result};
use crate::model::Player;
use crate::{players, teams};

/// A price as supplied by a caller, before validation.
///
/// Transports hand over whatever the user typed, so the amount may arrive as
/// a JSON integer, a decimal, or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Amount(i64),
    Decimal(f64),
    Text(String),
    /// Any other JSON value (null, bool, array, object). Never a valid price.
    Other(serde_json::Value),
}

impl PriceInput {
    /// Resolve to a whole, non-negative dollar amount.
    pub fn resolve(&self) -> Result<u32> {
        let amount = match self {
            PriceInput::Amount(n) => *n,
            PriceInput::Decimal(f) => whole_amount(*f)?,
            PriceInput::Text(s) => {
                let digits = s.trim().trim_start_matches('$');
                match digits.parse::<i64>() {
                    Ok(n) => n,
                    Err(_) => {
                        let f = digits.parse::<f64>().map_err(|_| {
                            BoardError::invalid("price", format!("'{s}' is not a number"))
                        })?;
                        whole_amount(f)?
                    }
                }
            }
            PriceInput::Other(value) => {
                return Err(BoardError::invalid(
                    "price",
                    format!("expected a number, got {value}"),
                ))
            }
        };

        if amount < 0 {
            return Err(BoardError::invalid("price", "must not be negative"));
        }
        u32::try_from(amount).map_err(|_| BoardError::invalid("price", "is too large"))
    }
}

fn whole_amount(f: f64) -> Result<i64> {
    if !f.is_finite() || f.fract() != 0.0 {
        return Err(BoardError::invalid("price", "must be a whole number"));
    }
    if f < i64::MIN as f64 || f > i64::MAX as f64 {
        return Err(BoardError::invalid("price", "is too large"));
    }
    Ok(f as i64)
}

impl From<u32> for PriceInput {
    fn from(n: u32) -> Self {
        PriceInput::Amount(i64::from(n))
    }
}

impl From<&str> for PriceInput {
    fn from(s: &str) -> Self {
        PriceInput::Text(s.to_string())
    }
}

/// Everything needed to draft one player, collected up front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRequest {
    pub player_id: i64,
    pub price: PriceInput,
    pub team_id: i64,
}

impl DraftRequest {
    pub fn new(player_id: i64, price: impl Into<PriceInput>, team_id: i64) -> Self {
        DraftRequest {
            player_id,
            price: price.into(),
            team_id,
        }
    }
}

/// Draft a player.
///
/// Checks run in order: price, player (exists, still available), team
/// (exists), then affordability. The lookups and the write share one
/// transaction, so a rejected draft changes nothing and two concurrent drafts
/// of the same player cannot both succeed.
pub fn execute(db: &Database, request: &DraftRequest) -> Result<Player> {
    let price = request.price.resolve()?;
    let DraftRequest {
        player_id, team_id, ..
    } = *request;

    let player = db.write(|tx| {
        players::ensure_draftable(tx, player_id)?;

        let team = teams::find(tx, team_id)?.ok_or_else(|| BoardError::team_not_found(team_id))?;
        if !teams::can_afford(tx, &team, price)? {
            let remaining = teams::remaining_budget(tx, &team)?;
            warn!(
                "Rejected draft of player {} to team {}: ${} exceeds remaining ${}",
                player_id, team_id, price, remaining
            );
            return Err(BoardError::InsufficientBudget {
                team_id,
                price,
                remaining,
            });
        }

        players::set_drafted(tx, player_id, price, team_id)
    })?;

    info!(
        "Drafted {} ({}) to team {} for ${}",
        player.name, player.position, team_id, price
    );
    Ok(player)
}
