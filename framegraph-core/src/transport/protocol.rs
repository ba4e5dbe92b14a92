//! Control Protocol
//!
//! JSON messages exchanged with editor clients. Every message is an object
//! with an `action` field:
//!
//! - `command`: a graph edit or query, addressed by `topic`. Requests carry a
//!   `token` that is echoed in the reply; broadcasts carry `origin_id` instead.
//! - `result` / `error`: the reply to a command.
//! - `ping`: liveness check, answered with `"response": true`.
//! - `socket_info`: sent once on connect with the client's id.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::error::GraphError;
use crate::graph::{Connection, GraphConfig, NodeConfig, Options, Origin};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    AddNode,
    RemoveNode,
    UpdateNode,
    AddConnection,
    RemoveConnection,
    Config,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::AddNode => "add_node",
            Topic::RemoveNode => "remove_node",
            Topic::UpdateNode => "update_node",
            Topic::AddConnection => "add_connection",
            Topic::RemoveConnection => "remove_connection",
            Topic::Config => "config",
        }
    }
}

/// A decoded graph command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddNode(NodeConfig),
    RemoveNode { id: String },
    UpdateNode { id: String, options: JsonValue },
    AddConnection(Connection),
    RemoveConnection(Connection),
    Config,
}

impl Command {
    pub fn topic(&self) -> Topic {
        match self {
            Command::AddNode(_) => Topic::AddNode,
            Command::RemoveNode { .. } => Topic::RemoveNode,
            Command::UpdateNode { .. } => Topic::UpdateNode,
            Command::AddConnection(_) => Topic::AddConnection,
            Command::RemoveConnection(_) => Topic::RemoveConnection,
            Command::Config => Topic::Config,
        }
    }
}

/// A decoded client message.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Ping,
    Command { token: JsonValue, command: Command },
}

/// A message that could not be decoded.
///
/// `token` is recovered when the envelope was readable, so the error reply
/// can still be matched to its request.
#[derive(Debug, Clone, PartialEq)]
pub struct Malformed {
    pub token: JsonValue,
    pub reason: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum Action {
    Command,
    Ping,
}

#[derive(Deserialize)]
struct Envelope {
    action: Action,
    #[serde(default)]
    topic: Option<Topic>,
    #[serde(default)]
    token: JsonValue,
}

#[derive(Deserialize)]
struct AddNodeBody {
    node: NodeConfig,
}

#[derive(Deserialize)]
struct RemoveNodeBody {
    id: String,
}

#[derive(Deserialize)]
struct UpdateNodeBody {
    id: String,
    #[serde(default)]
    options: JsonValue,
}

#[derive(Deserialize)]
struct ConnectionBody {
    connection: Connection,
}

/// Decode a text frame into a [`Request`].
pub fn parse_request(text: &str) -> Result<Request, Malformed> {
    let message: JsonValue = serde_json::from_str(text).map_err(|err| Malformed {
        token: JsonValue::Null,
        reason: err.to_string(),
    })?;

    let envelope = Envelope::deserialize(&message).map_err(|err| Malformed {
        token: message.get("token").cloned().unwrap_or_default(),
        reason: err.to_string(),
    })?;
    let token = envelope.token;

    match envelope.action {
        Action::Ping => Ok(Request::Ping),
        Action::Command => {
            let Some(topic) = envelope.topic else {
                return Err(Malformed {
                    token,
                    reason: "command without topic".into(),
                });
            };

            match parse_command(topic, &message) {
                Ok(command) => Ok(Request::Command { token, command }),
                Err(err) => Err(Malformed {
                    token,
                    reason: format!("{}: {err}", topic.as_str()),
                }),
            }
        }
    }
}

fn parse_command(topic: Topic, message: &JsonValue) -> Result<Command, serde_json::Error> {
    let command = match topic {
        Topic::AddNode => Command::AddNode(AddNodeBody::deserialize(message)?.node),
        Topic::RemoveNode => Command::RemoveNode {
            id: RemoveNodeBody::deserialize(message)?.id,
        },
        Topic::UpdateNode => {
            let body = UpdateNodeBody::deserialize(message)?;
            Command::UpdateNode {
                id: body.id,
                options: body.options,
            }
        }
        Topic::AddConnection => {
            Command::AddConnection(ConnectionBody::deserialize(message)?.connection)
        }
        Topic::RemoveConnection => {
            Command::RemoveConnection(ConnectionBody::deserialize(message)?.connection)
        }
        Topic::Config => Command::Config,
    };
    Ok(command)
}

pub fn socket_info(origin: Origin) -> JsonValue {
    json!({"action": "socket_info", "id": origin})
}

pub fn ping_response() -> JsonValue {
    json!({"action": "ping", "response": true})
}

pub fn result(token: &JsonValue) -> JsonValue {
    json!({"action": "result", "token": token})
}

pub fn config_result(token: &JsonValue, config: &GraphConfig) -> JsonValue {
    json!({"action": "result", "token": token, "config": config})
}

pub fn error(token: &JsonValue, err: &GraphError) -> JsonValue {
    error_code(token, err.code())
}

pub fn error_code(token: &JsonValue, code: &str) -> JsonValue {
    json!({"action": "error", "token": token, "error": code})
}

fn broadcast(topic: Topic, origin: Origin) -> JsonValue {
    json!({"action": "command", "topic": topic, "origin_id": origin})
}

pub fn add_node_event(type_name: &str, id: &str, options: &Options, origin: Origin) -> JsonValue {
    let mut payload = broadcast(Topic::AddNode, origin);
    payload["node"] = json!({"type": type_name, "id": id, "options": options});
    payload
}

pub fn remove_node_event(id: &str, origin: Origin) -> JsonValue {
    let mut payload = broadcast(Topic::RemoveNode, origin);
    payload["id"] = json!(id);
    payload
}

pub fn update_node_event(id: &str, options: &Options, origin: Origin) -> JsonValue {
    let mut payload = broadcast(Topic::UpdateNode, origin);
    payload["id"] = json!(id);
    payload["options"] = json!(options);
    payload
}

pub fn add_connection_event(con: &Connection, origin: Origin) -> JsonValue {
    let mut payload = broadcast(Topic::AddConnection, origin);
    payload["connection"] = json!(con);
    payload
}

pub fn remove_connection_event(con: &Connection, origin: Origin) -> JsonValue {
    let mut payload = broadcast(Topic::RemoveConnection, origin);
    payload["connection"] = json!(con);
    payload
}
