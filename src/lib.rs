use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod board;
pub mod config;
pub mod game;
pub mod protocol;
pub mod rate_limit;
pub mod room;
pub mod sanitize;
pub mod transport;
pub mod types;

pub use board::Board;
pub use config::{ConfigError, RoomConfig};
pub use game::{MoveRejection, process_move};
pub use protocol::{ClientMessage, ErrorCode, ServerMessage};
pub use room::{Room, RoomError};
pub use transport::{Outbox, Outgoing, Transport};
pub use types::{ChatMessage, Color, EndReason, GameState, GameStatus, Player, Position, Winner};

#[wasm_bindgen]
pub fn wasm_ready() -> bool {
    true
}

/// Legal placements for `color` on a board in wire form, for client-side highlighting.
#[wasm_bindgen]
pub fn valid_moves(board: JsValue, color: &str) -> Result<JsValue, JsValue> {
    let board: Board = serde_wasm_bindgen::from_value(board)?;
    let color =
        Color::parse(color).ok_or_else(|| JsValue::from_str(&format!("unknown color: {color}")))?;
    to_js(&board.valid_moves(color))
}

/// One room, driven by a JS host that owns the sockets.
///
/// Every event method returns the frames to deliver as `[{ to, frame }]`.
#[wasm_bindgen]
pub struct RoomServer {
    room: Room,
    outbox: Outbox,
}

#[wasm_bindgen]
impl RoomServer {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<RoomServer, JsValue> {
        let config: RoomConfig = if config.is_undefined() || config.is_null() {
            RoomConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        let config = config
            .validate()
            .map_err(|err| JsValue::from_str(&err.to_string()))?;

        Ok(Self {
            room: Room::new(config),
            outbox: Outbox::new(),
        })
    }

    pub fn connect(&mut self, id: &str) {
        self.outbox.connect(id);
    }

    pub fn message(&mut self, id: &str, frame: &str) -> Result<JsValue, JsValue> {
        self.room.on_message(&mut self.outbox, id, frame);
        self.flush()
    }

    pub fn close(&mut self, id: &str) -> Result<JsValue, JsValue> {
        self.outbox.disconnect(id);
        self.room.on_close(&mut self.outbox, id);
        self.flush()
    }

    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_js(self.room.state())
    }
}

impl RoomServer {
    fn flush(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.outbox.drain())
    }
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}
