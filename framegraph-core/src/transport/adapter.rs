//! WebSocket Broadcast
//!
//! Graph events are encoded once and queued to every connected client.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value as JsonValue;
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::tungstenite::Message;
use tracing::trace;

use super::protocol;
use crate::graph::{Adapter, Connection, Options, Origin};

/// Outgoing queues of every connected client.
pub type ClientMap = Arc<DashMap<Origin, UnboundedSender<Message>>>;

/// Broadcasts accepted graph mutations to every connected client.
///
/// Emission only enqueues on unbounded channels, so it never blocks the
/// thread holding the graph lock.
pub struct WebSocketAdapter {
    clients: ClientMap,
}

impl WebSocketAdapter {
    pub fn new(clients: ClientMap) -> Self {
        Self { clients }
    }

    fn broadcast(&self, payload: JsonValue) {
        let text = payload.to_string();
        trace!("Broadcasting to {} clients: {text}", self.clients.len());

        for client in self.clients.iter() {
            // A closed channel means the client is disconnecting; its task
            // removes the entry.
            let _ = client.value().send(Message::Text(text.clone()));
        }
    }
}

impl Adapter for WebSocketAdapter {
    fn emit_add_node(&self, type_name: &str, id: &str, options: &Options, origin: Origin) {
        self.broadcast(protocol::add_node_event(type_name, id, options, origin));
    }

    fn emit_remove_node(&self, id: &str, origin: Origin) {
        self.broadcast(protocol::remove_node_event(id, origin));
    }

    fn emit_update_node(&self, id: &str, options: &Options, origin: Origin) {
        self.broadcast(protocol::update_node_event(id, options, origin));
    }

    fn emit_add_connection(&self, con: &Connection, origin: Origin) {
        self.broadcast(protocol::add_connection_event(con, origin));
    }

    fn emit_remove_connection(&self, con: &Connection, origin: Origin) {
        self.broadcast(protocol::remove_connection_event(con, origin));
    }
}
