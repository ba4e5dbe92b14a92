//! Control Transport
//!
//! Exposes the graph to editor clients over WebSocket. Each connection gets
//! an [`Origin`](crate::graph::Origin) id; commands from that client are
//! applied to the [`GraphManager`](crate::graph::GraphManager) inline on the
//! connection task, and every accepted mutation is broadcast back to all
//! clients through [`WebSocketAdapter`].
//!
//! See [`protocol`] for the message shapes.

mod adapter;
pub mod protocol;
mod server;

pub use adapter::{ClientMap, WebSocketAdapter};
pub use server::{handle_message, ControlServer};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
