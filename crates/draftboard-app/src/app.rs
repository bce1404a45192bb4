// Application state and the request loop that serves WebSocket clients.

use std::fs::File;
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use draftboard_core::{Board, BoardError, DraftRequest, ErrorKind};

use crate::config::Config;
use crate::protocol::{self, Command, ProtocolErrorKind, Response};
use crate::ws_server::WsEvent;

/// Everything the request loop needs: the loaded config and the shared board.
pub struct AppState {
    pub config: Config,
    pub board: Arc<Board>,
}

impl AppState {
    pub fn new(config: Config, board: Board) -> Self {
        AppState {
            config,
            board: Arc::new(board),
        }
    }
}

/// Run one command against the board and build its response frame.
pub fn handle_command(state: &AppState, request_id: Option<u64>, command: Command) -> Response {
    let board = &state.board;
    match command {
        Command::ListPlayers => respond(request_id, board.list_players()),
        Command::GetPlayer { player_id } => respond(request_id, board.players().get(player_id)),
        Command::ReplacePlayers { rows } => respond(request_id, board.ingest_rows(&rows)),
        Command::UploadCsv { contents } => {
            respond(request_id, board.ingest_csv(contents.as_bytes()))
        }
        Command::DraftPlayer {
            player_id,
            price,
            team_id,
        } => respond(
            request_id,
            board.draft(&DraftRequest {
                player_id,
                price,
                team_id,
            }),
        ),
        Command::ClearPlayers => respond(request_id, board.players().clear_all().map(removed)),
        Command::ListTeams => respond(request_id, board.list_teams()),
        Command::GetTeam { team_id } => respond(request_id, board.teams().get(team_id)),
        Command::InitializeTeams { count, budget } => {
            let count = count.unwrap_or(state.config.league.num_teams);
            let budget = budget.unwrap_or(state.config.league.default_budget);
            respond(request_id, board.teams().initialize(count, budget))
        }
        Command::RenameTeam { team_id, name } => {
            respond(request_id, board.teams().rename(team_id, &name))
        }
        Command::ClearTeams => respond(request_id, board.teams().clear_all().map(removed)),
    }
}

fn removed(count: usize) -> Value {
    json!({ "removed": count })
}

fn respond<T: Serialize>(request_id: Option<u64>, result: Result<T, BoardError>) -> Response {
    match result {
        Ok(payload) => Response::ok(request_id, &payload),
        Err(e) => {
            if e.kind() == ErrorKind::Storage {
                warn!("Storage failure: {e}");
            } else {
                debug!("Request rejected: {e}");
            }
            Response::board_error(request_id, &e)
        }
    }
}

/// Turn one text frame into exactly one response frame.
pub fn handle_request_text(state: &AppState, text: &str) -> String {
    let request = match protocol::parse_request(text) {
        Ok(request) => request,
        Err(failure) => {
            warn!("Rejected malformed request: {}", failure.message);
            return Response::protocol_error(
                failure.request_id,
                ProtocolErrorKind::BadRequest,
                failure.message,
            )
            .to_json();
        }
    };

    debug!(
        "Handling {:?} (request_id={:?})",
        request.command, request.request_id
    );
    handle_command(state, request.request_id, request.command).to_json()
}

/// Load the configured seed CSV into an empty player table. Returns the
/// number of players inserted (0 when no seed is configured or players
/// already exist).
pub fn seed_from_csv(state: &AppState) -> anyhow::Result<usize> {
    let Some(path) = state.config.seed_csv.as_deref() else {
        return Ok(0);
    };

    if !state.board.list_players()?.is_empty() {
        info!("Player table already populated; skipping seed CSV {path}");
        return Ok(0);
    }

    let file = File::open(path).with_context(|| format!("failed to open seed CSV {path}"))?;
    let summary = state
        .board
        .ingest_csv(file)
        .with_context(|| format!("failed to ingest seed CSV {path}"))?;
    info!(
        "Seeded {} players from {path} ({} rows skipped)",
        summary.inserted, summary.skipped
    );
    Ok(summary.inserted)
}

/// Serve WebSocket events until the server side of the channel closes.
pub async fn run(mut ws_rx: mpsc::Receiver<WsEvent>, state: AppState) -> anyhow::Result<()> {
    info!("Application event loop started");

    while let Some(event) = ws_rx.recv().await {
        match event {
            WsEvent::Connected { addr } => info!("Client connected from {addr}"),
            WsEvent::Disconnected { addr } => info!("Client {addr} disconnected"),
            WsEvent::Request { addr, text, reply } => {
                let response = handle_request_text(&state, &text);
                if reply.send(response).is_err() {
                    debug!("Client {addr} went away before its reply was sent");
                }
            }
        }
    }

    info!("WebSocket channel closed, shutting down");
    Ok(())
}
