// Library root: the draft board's consistency core.

pub mod board;
pub mod db;
pub mod draft;
pub mod error;
pub mod ingest;
pub mod model;
pub mod players;
pub mod teams;

pub use board::Board;
pub use draft::{DraftRequest, PriceInput};
pub use error::{BoardError, ErrorKind};
pub use model::{NewPlayer, Player, Position, Team};
