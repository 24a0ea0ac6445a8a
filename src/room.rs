use std::collections::BTreeSet;

use log::{debug, info, warn};
use thiserror::Error;
use web_time::{Instant, SystemTime, UNIX_EPOCH};

use crate::board::BOARD_SIZE;
use crate::config::RoomConfig;
use crate::game::{MoveRejection, process_move};
use crate::protocol::{self, ClientMessage, ErrorCode, ServerMessage};
use crate::rate_limit::RateLimiter;
use crate::sanitize::{sanitize, sanitize_name};
use crate::transport::Transport;
use crate::types::{ChatMessage, Color, ConnectionId, GameState, GameStatus, Player};

const MAX_PLAYERS: usize = 2;

/// Why an inbound frame produced no state change.
///
/// Only `Capacity` and `Unauthorized` are reported back to the sender; every
/// other variant is dropped without a reply.
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("malformed frame: {0}")]
    Protocol(#[from] serde_json::Error),
    #[error("room already has two players")]
    Capacity,
    #[error("sender may not move now")]
    Unauthorized,
    #[error("{0}")]
    Validation(&'static str),
    #[error("move rejected: {0}")]
    Move(#[from] MoveRejection),
    #[error("rate limit exceeded")]
    RateLimited,
}

impl RoomError {
    pub fn reply_code(&self) -> Option<ErrorCode> {
        match self {
            RoomError::Capacity => Some(ErrorCode::RoomFull),
            RoomError::Unauthorized => Some(ErrorCode::Unauthorized),
            RoomError::Protocol(_)
            | RoomError::Validation(_)
            | RoomError::Move(_)
            | RoomError::RateLimited => None,
        }
    }
}

/// Authoritative state for one match plus the per-connection ledgers that
/// live and die with it.
///
/// A room is a sequential actor: the host must feed it one event at a time.
#[derive(Debug)]
pub struct Room {
    config: RoomConfig,
    state: GameState,
    limiter: RateLimiter,
    rematch_votes: BTreeSet<ConnectionId>,
    chat_seq: u64,
}

impl Room {
    pub fn new(config: RoomConfig) -> Self {
        let limiter = RateLimiter::new(config.rate_limit_max, config.rate_limit_window());
        Self {
            config,
            state: GameState::new(),
            limiter,
            rematch_votes: BTreeSet::new(),
            chat_seq: 0,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn rematch_votes(&self) -> usize {
        self.rematch_votes.len()
    }

    pub fn on_message(&mut self, transport: &mut dyn Transport, sender: &str, frame: &str) {
        self.on_message_at(transport, sender, frame, Instant::now());
    }

    /// Handles one inbound frame as if it arrived at `now`.
    pub fn on_message_at(
        &mut self,
        transport: &mut dyn Transport,
        sender: &str,
        frame: &str,
        now: Instant,
    ) {
        if let Err(err) = self.dispatch(transport, sender, frame, now) {
            match err.reply_code() {
                Some(code) => {
                    debug!("rejecting frame from {sender}: {err}");
                    self.send(transport, sender, &ServerMessage::Error { code });
                }
                None => debug!("dropping frame from {sender}: {err}"),
            }
        }
    }

    /// Connection-close notification; the substrate calls this exactly once per connection.
    pub fn on_close(&mut self, transport: &mut dyn Transport, id: &str) {
        self.limiter.forget(id);

        let Some(index) = self.state.players.iter().position(|p| p.id == id) else {
            debug!("non-player connection {id} closed");
            return;
        };
        let player = self.state.players.remove(index);
        self.rematch_votes.remove(id);
        info!("{} ({:?}) left the room", player.name, player.color);

        self.broadcast(transport, &ServerMessage::OpponentLeft, Some(id));

        if self.state.status == GameStatus::Playing {
            self.state.status = GameStatus::Finished;
            self.state.winner = None;
            self.state.end_reason = None;
            self.broadcast_state(transport, Some(id));
        }
    }

    fn dispatch(
        &mut self,
        transport: &mut dyn Transport,
        sender: &str,
        frame: &str,
        now: Instant,
    ) -> Result<(), RoomError> {
        if !self.limiter.check(sender, now) {
            return Err(RoomError::RateLimited);
        }

        match protocol::decode(frame)? {
            ClientMessage::Join {
                name,
                preferred_color,
            } => self.join(transport, sender, name.as_deref().unwrap_or(""), preferred_color),
            ClientMessage::Move { row, col } => self.make_move(transport, sender, row, col),
            ClientMessage::Chat { text } => self.chat(transport, sender, &text),
            ClientMessage::RematchRequest => self.rematch_request(transport, sender),
            ClientMessage::RematchAccept => self.rematch_accept(transport, sender),
            ClientMessage::RematchDecline => self.rematch_decline(transport, sender),
        }
    }

    fn join(
        &mut self,
        transport: &mut dyn Transport,
        sender: &str,
        raw_name: &str,
        preferred_color: Option<Color>,
    ) -> Result<(), RoomError> {
        if self.state.players.len() >= MAX_PLAYERS {
            return Err(RoomError::Capacity);
        }
        if self.state.player(sender).is_some() {
            return Err(RoomError::Validation("connection already joined"));
        }

        // A leftover finished match never carries over to a new opponent.
        if self.state.status == GameStatus::Finished {
            let players = std::mem::take(&mut self.state.players);
            self.state = GameState {
                players,
                ..GameState::new()
            };
            self.rematch_votes.clear();
        }

        let color = match self.state.players.first() {
            Some(first) => first.color.opponent(),
            None => preferred_color.unwrap_or(Color::Black),
        };
        let name = sanitize_name(
            raw_name,
            self.config.max_name_length,
            &self.config.default_name,
        );
        info!("{name} joined as {color:?}");
        self.state.players.push(Player {
            id: sender.to_string(),
            color,
            name,
        });

        self.send(
            transport,
            sender,
            &ServerMessage::Init {
                state: self.state.clone(),
                my_id: sender.to_string(),
            },
        );

        if self.state.players.len() == MAX_PLAYERS {
            self.state.status = GameStatus::Playing;
            info!("match started");
            self.broadcast_state(transport, None);
        }

        Ok(())
    }

    fn make_move(
        &mut self,
        transport: &mut dyn Transport,
        sender: &str,
        row: i64,
        col: i64,
    ) -> Result<(), RoomError> {
        if self.state.status != GameStatus::Playing {
            return Err(RoomError::Validation("game is not in progress"));
        }
        let (Some(row), Some(col)) = (board_index(row), board_index(col)) else {
            return Err(RoomError::Validation("coordinates off the board"));
        };
        match self.state.player(sender) {
            Some(player) if player.color == self.state.current_player => {}
            _ => return Err(RoomError::Unauthorized),
        }

        let next = process_move(&self.state, row, col, sender)?;
        if next.status == GameStatus::Finished {
            info!(
                "match finished: {:?} by {:?}",
                next.winner, next.end_reason
            );
        }
        self.state = next;
        self.broadcast_state(transport, None);
        Ok(())
    }

    fn chat(
        &mut self,
        transport: &mut dyn Transport,
        sender: &str,
        text: &str,
    ) -> Result<(), RoomError> {
        let player_name = match self.state.player(sender) {
            Some(player) => player.name.clone(),
            None => return Err(RoomError::Validation("chat from non-player")),
        };

        let text = sanitize(text, self.config.max_chat_length);
        if text.trim().is_empty() {
            return Err(RoomError::Validation("blank chat message"));
        }

        self.chat_seq += 1;
        let timestamp = now_ms();
        let message = ChatMessage {
            id: format!("{timestamp:x}-{:x}", self.chat_seq),
            player_id: sender.to_string(),
            player_name,
            text,
            timestamp,
        };
        self.broadcast(transport, &ServerMessage::Chat { message }, None);
        Ok(())
    }

    fn rematch_request(
        &mut self,
        transport: &mut dyn Transport,
        sender: &str,
    ) -> Result<(), RoomError> {
        if self.state.status != GameStatus::Finished {
            return Err(RoomError::Validation("rematch request before the match ended"));
        }
        if self.state.player(sender).is_none() {
            return Err(RoomError::Validation("rematch request from non-player"));
        }
        self.rematch_votes.insert(sender.to_string());
        self.broadcast(
            transport,
            &ServerMessage::RematchRequest {
                from_id: sender.to_string(),
            },
            Some(sender),
        );
        self.start_rematch_if_agreed(transport);
        Ok(())
    }

    fn rematch_accept(
        &mut self,
        transport: &mut dyn Transport,
        sender: &str,
    ) -> Result<(), RoomError> {
        self.rematch_votes.insert(sender.to_string());
        self.start_rematch_if_agreed(transport);
        Ok(())
    }

    fn rematch_decline(
        &mut self,
        transport: &mut dyn Transport,
        sender: &str,
    ) -> Result<(), RoomError> {
        self.rematch_votes.clear();
        info!("rematch declined by {sender}");
        self.broadcast(transport, &ServerMessage::RematchDeclined, None);
        Ok(())
    }

    fn start_rematch_if_agreed(&mut self, transport: &mut dyn Transport) {
        if self.rematch_votes.len() >= MAX_PLAYERS && self.state.players.len() == MAX_PLAYERS {
            self.start_rematch(transport);
        }
    }

    fn start_rematch(&mut self, transport: &mut dyn Transport) {
        self.rematch_votes.clear();

        let players = self
            .state
            .players
            .iter()
            .map(|player| Player {
                color: player.color.opponent(),
                ..player.clone()
            })
            .collect();
        self.state = GameState::rematch(players);
        info!("rematch started with colors swapped");

        self.broadcast(transport, &ServerMessage::RematchAccepted, None);
        self.broadcast_state(transport, None);
    }

    fn broadcast_state(&self, transport: &mut dyn Transport, exclude: Option<&str>) {
        let message = ServerMessage::StateUpdate {
            state: self.state.clone(),
        };
        self.broadcast(transport, &message, exclude);
    }

    fn send(&self, transport: &mut dyn Transport, to: &str, message: &ServerMessage) {
        match protocol::encode(message) {
            Ok(frame) => transport.send(to, &frame),
            Err(err) => warn!("failed to encode frame for {to}: {err}"),
        }
    }

    fn broadcast(
        &self,
        transport: &mut dyn Transport,
        message: &ServerMessage,
        exclude: Option<&str>,
    ) {
        let frame = match protocol::encode(message) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("failed to encode broadcast frame: {err}");
                return;
            }
        };
        for conn in transport.connections() {
            if exclude != Some(conn.as_str()) {
                transport.send(&conn, &frame);
            }
        }
    }
}

impl Default for Room {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

fn board_index(value: i64) -> Option<u8> {
    u8::try_from(value)
        .ok()
        .filter(|&index| (index as usize) < BOARD_SIZE)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
