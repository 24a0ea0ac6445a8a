use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, Color, ConnectionId, GameState};

/// Frames a client may send. Anything that does not decode into one of these
/// (including unknown `type` values) is dropped by the room.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Join {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        preferred_color: Option<Color>,
    },
    Move {
        row: i64,
        col: i64,
    },
    Chat {
        text: String,
    },
    RematchRequest,
    RematchAccept,
    RematchDecline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RoomFull,
    RoomNotFound,
    Unauthorized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Init {
        state: GameState,
        my_id: ConnectionId,
    },
    StateUpdate {
        state: GameState,
    },
    Chat {
        message: ChatMessage,
    },
    Error {
        code: ErrorCode,
    },
    OpponentLeft,
    RematchRequest {
        from_id: ConnectionId,
    },
    RematchAccepted,
    RematchDeclined,
}

pub fn decode(frame: &str) -> Result<ClientMessage, serde_json::Error> {
    serde_json::from_str(frame)
}

pub fn encode(message: &ServerMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}
