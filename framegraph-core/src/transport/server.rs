//! Control Server
//!
//! Accepts editor connections over WebSocket, applies their commands to the
//! graph, and replies on the same socket. Graph events reach every client
//! through the [`WebSocketAdapter`] registered at construction.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value as JsonValue;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::adapter::{ClientMap, WebSocketAdapter};
use super::protocol::{self, Command, Request};
use super::TransportError;
use crate::error::GraphError;
use crate::graph::{GraphManager, Origin};

/// WebSocket server applying client commands to a [`GraphManager`].
pub struct ControlServer {
    graph: Arc<GraphManager>,
    clients: ClientMap,
    next_client: AtomicI64,
    stopped: watch::Sender<bool>,
}

impl ControlServer {
    /// Create a server and register its broadcast adapter with `graph`.
    pub fn new(graph: Arc<GraphManager>) -> Arc<Self> {
        let clients = ClientMap::default();
        graph.add_adapter(Box::new(WebSocketAdapter::new(Arc::clone(&clients))));

        Arc::new(Self {
            graph,
            clients,
            next_client: AtomicI64::new(0),
            stopped: watch::channel(false).0,
        })
    }

    /// Accept connections on `listener` until `shutdown` resolves.
    pub async fn serve(
        self: Arc<Self>,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), TransportError> {
        let addr = listener.local_addr()?;
        info!("Control server listening on ws://{addr}");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(err) => {
                            warn!("Failed to accept connection: {err}");
                            continue;
                        }
                    };
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(err) = server.handle_connection(stream, peer).await {
                            warn!("Connection from {peer} failed: {err}");
                        }
                    });
                }
                _ = &mut shutdown => break,
            }
        }

        // Open connections stop reading before any further command is applied.
        self.stopped.send_replace(true);
        self.clients.clear();
        info!("Control server stopped");
        Ok(())
    }

    async fn handle_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
    ) -> Result<(), TransportError> {
        let stopped = wait_stopped(self.stopped.subscribe());
        let websocket = tokio_tungstenite::accept_async(stream).await?;
        let (mut sink, mut source) = websocket.split();

        let origin = Origin(self.next_client.fetch_add(1, Ordering::Relaxed));
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.clients.insert(origin, tx.clone());
        info!("Client {origin} connected from {peer}");

        let _ = tx.send(Message::Text(protocol::socket_info(origin).to_string()));

        let writer = async {
            while let Some(message) = rx.recv().await {
                if sink.send(message).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        };

        let reader = async {
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if let Some(reply) = handle_message(&self.graph, &text, origin) {
                            let _ = tx.send(Message::Text(reply.to_string()));
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        debug!("Client {origin} read error: {err}");
                        break;
                    }
                }
            }
        };

        let shut_down = tokio::select! {
            biased;
            _ = stopped => true,
            _ = writer => false,
            _ = reader => false,
        };

        if shut_down {
            let _ = sink.close().await;
        }
        self.clients.remove(&origin);
        info!("Client {origin} disconnected");
        Ok(())
    }
}

/// Resolves once the server has been told to stop.
async fn wait_stopped(mut stopped: watch::Receiver<bool>) {
    while !*stopped.borrow_and_update() {
        if stopped.changed().await.is_err() {
            return;
        }
    }
}

/// Decode one text frame from `origin`, apply it, and build the reply.
///
/// Returns `None` for messages that need no reply.
pub fn handle_message(graph: &GraphManager, text: &str, origin: Origin) -> Option<JsonValue> {
    let (token, command) = match protocol::parse_request(text) {
        Ok(Request::Ping) => return Some(protocol::ping_response()),
        Ok(Request::Command { token, command }) => (token, command),
        Err(malformed) => {
            warn!("Malformed payload from client {origin}: {}", malformed.reason);
            let err = GraphError::MalformedPayload(malformed.reason);
            return Some(protocol::error(&malformed.token, &err));
        }
    };

    debug!("Client {origin} sent {}", command.topic().as_str());

    let outcome = match command {
        Command::AddNode(node) => graph.add_node(
            &node.type_name,
            &node.id,
            &JsonValue::Object(node.options),
            origin,
        ),
        Command::RemoveNode { id } => graph.remove_node(&id, origin),
        Command::UpdateNode { id, options } => graph.update_node(&id, &options, origin),
        Command::AddConnection(con) => graph.add_connection(con, origin),
        Command::RemoveConnection(con) => graph.remove_connection(&con, origin),
        Command::Config => return Some(protocol::config_result(&token, &graph.get_config())),
    };

    Some(match outcome {
        Ok(()) => protocol::result(&token),
        Err(err) => protocol::error(&token, &err),
    })
}
