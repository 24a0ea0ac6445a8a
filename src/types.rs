use serde::{Deserialize, Serialize};

use crate::board::Board;

/// Stable identifier the connection substrate assigns to each socket.
pub type ConnectionId = String;

/// A board coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "black" => Some(Color::Black),
            "white" => Some(Color::White),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Black,
    White,
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    Full,
    BothPass,
    Annihilated,
}

/// Piece tally for both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceCount {
    pub black: u8,
    pub white: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: ConnectionId,
    pub color: Color,
    pub name: String,
}

/// Authoritative match state, broadcast verbatim to every connection.
///
/// Contract:
/// - `winner` and `end_reason` are only populated once `status` is `Finished`,
///   except after a mid-game departure where both stay `None`.
/// - `players` never holds more than two entries, and their colors differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub board: Board,
    pub current_player: Color,
    pub players: Vec<Player>,
    pub status: GameStatus,
    pub winner: Option<Winner>,
    pub pass_count: u32,
    pub end_reason: Option<EndReason>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub player_id: ConnectionId,
    pub player_name: String,
    pub text: String,
    /// Unix epoch milliseconds, assigned by the server.
    pub timestamp: u64,
}
