use log::debug;
use serde::Serialize;

use crate::types::ConnectionId;

/// The connection substrate a room talks through.
///
/// Implementations deliver frames reliably and in order, and stop listing a
/// connection once it has closed.
pub trait Transport {
    fn connections(&self) -> Vec<ConnectionId>;
    fn send(&mut self, to: &str, frame: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outgoing {
    pub to: ConnectionId,
    pub frame: String,
}

/// In-memory transport: tracks open connections and queues frames for the
/// host to flush after each event.
#[derive(Debug, Default)]
pub struct Outbox {
    connections: Vec<ConnectionId>,
    queued: Vec<Outgoing>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, id: &str) {
        if !self.is_connected(id) {
            self.connections.push(id.to_string());
        }
    }

    pub fn disconnect(&mut self, id: &str) {
        self.connections.retain(|conn| conn != id);
    }

    pub fn is_connected(&self, id: &str) -> bool {
        self.connections.iter().any(|conn| conn == id)
    }

    /// Takes every queued frame, oldest first.
    pub fn drain(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.queued)
    }
}

impl Transport for Outbox {
    fn connections(&self) -> Vec<ConnectionId> {
        self.connections.clone()
    }

    fn send(&mut self, to: &str, frame: &str) {
        if !self.is_connected(to) {
            debug!("dropping frame for closed connection {to}");
            return;
        }
        self.queued.push(Outgoing {
            to: to.to_string(),
            frame: frame.to_string(),
        });
    }
}
