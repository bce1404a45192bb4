// JSON message protocol spoken over the WebSocket connection.
//
// Every text frame from a client is one request; every request gets exactly
// one response frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use draftboard_core::ingest::RawRow;
use draftboard_core::{BoardError, ErrorKind, PriceInput};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A board operation requested by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    ListPlayers,
    GetPlayer {
        player_id: i64,
    },
    ReplacePlayers {
        rows: Vec<RawRow>,
    },
    /// Raw CSV text, parsed server-side.
    UploadCsv {
        contents: String,
    },
    DraftPlayer {
        player_id: i64,
        price: PriceInput,
        team_id: i64,
    },
    ClearPlayers,
    ListTeams,
    GetTeam {
        team_id: i64,
    },
    InitializeTeams {
        #[serde(default)]
        count: Option<usize>,
        #[serde(default)]
        budget: Option<u32>,
    },
    RenameTeam {
        team_id: i64,
        name: String,
    },
    ClearTeams,
}

/// A parsed request: the command plus the client's correlation id, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub request_id: Option<u64>,
    pub command: Command,
}

/// Why a frame could not be turned into a [`Request`].
#[derive(Debug)]
pub struct ParseFailure {
    /// The correlation id, when the frame was at least a JSON object carrying one.
    pub request_id: Option<u64>,
    pub message: String,
}

/// Parse one text frame.
pub fn parse_request(text: &str) -> Result<Request, ParseFailure> {
    let mut value: Value = serde_json::from_str(text).map_err(|e| ParseFailure {
        request_id: None,
        message: format!("invalid JSON: {e}"),
    })?;

    let request_id = match value.as_object_mut() {
        Some(obj) => obj.remove("request_id").and_then(|id| id.as_u64()),
        None => {
            return Err(ParseFailure {
                request_id: None,
                message: "request must be a JSON object".into(),
            })
        }
    };

    let command = serde_json::from_value(value).map_err(|e| ParseFailure {
        request_id,
        message: format!("invalid request: {e}"),
    })?;

    Ok(Request {
        request_id,
        command,
    })
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Failures that happen outside the board itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolErrorKind {
    BadRequest,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FailureKind {
    Board(ErrorKind),
    Protocol(ProtocolErrorKind),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    Ok {
        request_id: Option<u64>,
        payload: Value,
    },
    Error {
        request_id: Option<u64>,
        error: ErrorBody,
    },
}

impl Response {
    /// Serialize `payload` into an `OK` response.
    pub fn ok<T: Serialize>(request_id: Option<u64>, payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(payload) => Response::Ok {
                request_id,
                payload,
            },
            Err(e) => Response::protocol_error(
                request_id,
                ProtocolErrorKind::Internal,
                format!("failed to encode response: {e}"),
            ),
        }
    }

    pub fn board_error(request_id: Option<u64>, err: &BoardError) -> Self {
        Response::Error {
            request_id,
            error: ErrorBody {
                kind: FailureKind::Board(err.kind()),
                message: err.to_string(),
            },
        }
    }

    pub fn protocol_error(
        request_id: Option<u64>,
        kind: ProtocolErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Response::Error {
            request_id,
            error: ErrorBody {
                kind: FailureKind::Protocol(kind),
                message: message.into(),
            },
        }
    }

    /// Encode for the wire. Falls back to a fixed error frame, since a
    /// response must always be sent.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"ERROR","request_id":null,"error":{"kind":"INTERNAL","message":"failed to encode response"}}"#
                .to_string()
        })
    }
}
