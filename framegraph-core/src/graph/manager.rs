//! Graph Manager
//!
//! Owns the node table and the global connection set, and is the only place
//! either is mutated. Every mutation runs under one lock and is validated in
//! full before any data structure is touched, so a rejected request never
//! leaves partial state behind.
//!
//! # Locking
//!
//! Public entry points take the lock once and delegate to `*_locked` helpers
//! that operate on `&mut GraphState`. Cascades (a node removal tearing down
//! its connections, an input eviction tearing down the old edge) collect the
//! edges to remove first and then run them through the same helpers, so no
//! path ever needs to re-acquire the lock.
//!
//! # Observers
//!
//! Registered [`Adapter`]s are notified synchronously, under the lock, after
//! each change commits. Adapters must not call back into the manager.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use super::connection::Connection;
use super::node::{Node, NodeRecord, NodeTable, Options};
use super::registry::NodeRegistry;
use super::validate::{self, Orientation};
use crate::error::{GraphError, GraphResult};

/// Identifies the client a mutation came from.
///
/// Threaded through every mutation and notification so transports can avoid
/// echoing a change back to the client that made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Origin(pub i64);

impl Origin {
    /// Mutations made by the process itself (startup load, tooling).
    pub const LOCAL: Origin = Origin(-1);
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observer of accepted graph mutations.
pub trait Adapter: Send + Sync {
    /// A node was added. `options` are the resolved options after filtering.
    fn emit_add_node(&self, type_name: &str, id: &str, options: &Options, origin: Origin);

    fn emit_remove_node(&self, id: &str, origin: Origin);

    /// A node's options changed. `options` holds only the accepted keys.
    fn emit_update_node(&self, id: &str, options: &Options, origin: Origin);

    fn emit_add_connection(&self, con: &Connection, origin: Origin);

    fn emit_remove_connection(&self, con: &Connection, origin: Origin);
}

/// One node entry in a graph configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub options: Options,
}

/// A full graph description, as produced by [`GraphManager::get_config`] and
/// consumed by [`GraphManager::set_config`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

/// Outcome of a bulk [`GraphManager::set_config`] load.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub nodes_added: usize,
    pub connections_added: usize,
    /// Entries that were rejected, with the reason.
    pub rejected: Vec<GraphError>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

struct GraphState {
    nodes: NodeTable,
    connections: IndexSet<Connection>,
    adapters: Vec<Box<dyn Adapter>>,
    /// Bumped on every committed mutation.
    generation: u64,
}

impl GraphState {
    fn emit(&self, f: impl Fn(&dyn Adapter)) {
        for adapter in &self.adapters {
            f(adapter.as_ref());
        }
    }

    fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

/// The mutable node graph shared between the control and render threads.
pub struct GraphManager {
    registry: Arc<NodeRegistry>,
    state: Mutex<GraphState>,
}

impl GraphManager {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            state: Mutex::new(GraphState {
                nodes: NodeTable::new(),
                connections: IndexSet::new(),
                adapters: Vec::new(),
                generation: 0,
            }),
        }
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn add_adapter(&self, adapter: Box<dyn Adapter>) {
        self.state.lock().adapters.push(adapter);
    }

    pub fn clear_adapters(&self) {
        self.state.lock().adapters.clear();
    }

    pub fn node_count(&self) -> usize {
        self.state.lock().nodes.len()
    }

    pub fn connection_count(&self) -> usize {
        self.state.lock().connections.len()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.state.lock().nodes.contains_key(id)
    }

    pub fn contains_connection(&self, con: &Connection) -> bool {
        self.state.lock().connections.contains(con)
    }

    /// Counter bumped by every committed mutation.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Create a node of `type_name` under `id`.
    pub fn add_node(
        &self,
        type_name: &str,
        id: &str,
        options: &JsonValue,
        origin: Origin,
    ) -> GraphResult {
        let mut state = self.state.lock();
        self.add_node_locked(&mut state, type_name, id, options, origin)
    }

    /// Remove a node and every connection touching it.
    pub fn remove_node(&self, id: &str, origin: Origin) -> GraphResult {
        let mut state = self.state.lock();
        info!("Removing node with id {id}");

        let Some(record) = state.nodes.get(id) else {
            warn!("Node with id {id} not found");
            return Err(GraphError::NotFound(format!("node {id}")));
        };

        let attached: IndexSet<Connection> = record
            .state
            .connection_map()
            .values()
            .flat_map(|set| set.iter().cloned())
            .collect();

        for con in &attached {
            // A connection already torn down by an earlier step is fine here.
            let _ = remove_connection_locked(&mut state, con, origin);
        }

        state.nodes.shift_remove(id);
        state.touch();
        state.emit(|a| a.emit_remove_node(id, origin));

        Ok(())
    }

    /// Apply a partial option update to an existing node.
    pub fn update_node(&self, id: &str, options: &JsonValue, origin: Origin) -> GraphResult {
        let mut state = self.state.lock();

        let Some(record) = state.nodes.get_mut(id) else {
            warn!("Update node: id {id} not found");
            return Err(GraphError::NotFound(format!("node {id}")));
        };

        info!("Updating node with id {id}");

        let node = Arc::clone(&record.node);
        let accepted = filter_options(node.as_ref(), options)?;
        record
            .state
            .options_mut()
            .extend(accepted.iter().map(|(k, v)| (k.clone(), v.clone())));

        state.touch();
        state.emit(|a| a.emit_update_node(id, &accepted, origin));

        Ok(())
    }

    /// Connect an output interface to an input interface.
    ///
    /// The endpoints may be given in either order; a request written
    /// input-first is swapped before it is stored.
    pub fn add_connection(&self, con: Connection, origin: Origin) -> GraphResult {
        let mut state = self.state.lock();
        add_connection_locked(&mut state, con, origin)
    }

    pub fn remove_connection(&self, con: &Connection, origin: Origin) -> GraphResult {
        let mut state = self.state.lock();
        remove_connection_locked(&mut state, con, origin)
    }

    /// A consistent copy of every node and connection.
    pub fn get_config(&self) -> GraphConfig {
        let state = self.state.lock();

        let nodes = state
            .nodes
            .iter()
            .map(|(id, record)| NodeConfig {
                id: id.clone(),
                type_name: record.node.type_name().to_owned(),
                options: record.state.options().clone(),
            })
            .collect();

        GraphConfig {
            nodes,
            connections: state.connections.iter().cloned().collect(),
        }
    }

    /// Replay every node and connection of `config` through the regular
    /// validation path.
    ///
    /// Loading is best effort: invalid entries are skipped and reported, the
    /// rest is applied. The whole load happens under one lock, so a tick sees
    /// either none or all of it.
    pub fn set_config(&self, config: &GraphConfig) -> LoadReport {
        let mut state = self.state.lock();
        let mut report = LoadReport::default();

        for node in &config.nodes {
            let options = JsonValue::Object(node.options.clone());
            match self.add_node_locked(&mut state, &node.type_name, &node.id, &options, Origin::LOCAL)
            {
                Ok(()) => report.nodes_added += 1,
                Err(err) => report.rejected.push(err),
            }
        }

        for con in &config.connections {
            match add_connection_locked(&mut state, con.clone(), Origin::LOCAL) {
                Ok(()) => report.connections_added += 1,
                Err(err) => report.rejected.push(err),
            }
        }

        if !report.is_complete() {
            warn!(
                "Graph config loaded partially, {} entries rejected",
                report.rejected.len()
            );
        }

        report
    }

    /// Parse a raw configuration document and load it.
    pub fn set_config_json(&self, document: &JsonValue) -> GraphResult<LoadReport> {
        let config = GraphConfig::deserialize(document)
            .map_err(|e| GraphError::MalformedPayload(e.to_string()))?;
        Ok(self.set_config(&config))
    }

    /// Drop every node and connection without notifying adapters.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.nodes.clear();
        state.connections.clear();
        state.touch();
    }

    /// Copy the node table if it changed since `seen_generation`.
    ///
    /// Node instances are shared with the graph; their states are deep
    /// copies, so later mutations do not affect the returned table.
    pub fn snapshot_since(&self, seen_generation: Option<u64>) -> Option<(u64, NodeTable)> {
        let state = self.state.lock();
        if seen_generation == Some(state.generation) {
            return None;
        }
        Some((state.generation, state.nodes.clone()))
    }

    /// Copy the node table unconditionally.
    pub fn snapshot(&self) -> NodeTable {
        self.state.lock().nodes.clone()
    }

    fn add_node_locked(
        &self,
        state: &mut GraphState,
        type_name: &str,
        id: &str,
        options: &JsonValue,
        origin: Origin,
    ) -> GraphResult {
        info!("Creating {type_name} node with id {id}");

        if state.nodes.contains_key(id) {
            warn!("Node id {id} already in use");
            return Err(GraphError::DuplicateId(format!("node {id}")));
        }

        let node = self.registry.create(type_name).inspect_err(|e| {
            warn!("Cannot create node {id}: {e}");
        })?;

        let mut resolved = node.default_options();
        let accepted = filter_options(node.as_ref(), options)?;
        resolved.extend(accepted);

        let record = NodeRecord::new(node, resolved);
        state.nodes.insert(id.to_owned(), record);
        state.touch();

        let record = &state.nodes[id];
        state.emit(|a| a.emit_add_node(type_name, id, record.state.options(), origin));

        Ok(())
    }
}

/// Keep only the options that pass the common check or the node's validator.
///
/// A `null` payload counts as empty; anything else that is not an object is
/// rejected as a whole.
fn filter_options(node: &dyn Node, options: &JsonValue) -> GraphResult<Options> {
    let entries = match options {
        JsonValue::Null => return Ok(Options::new()),
        JsonValue::Object(map) => map,
        other => {
            return Err(GraphError::InvalidOptions(format!(
                "expected an object, got {other}"
            )))
        }
    };

    let mut accepted = Options::new();
    for (key, value) in entries {
        let mut value = value.clone();
        if validate::is_valid_common_option(key, &value) || node.test_option(key, &mut value) {
            accepted.insert(key.clone(), value);
        } else {
            debug!("Dropping invalid option {key} for {} node", node.type_name());
        }
    }

    Ok(accepted)
}

fn add_connection_locked(state: &mut GraphState, con: Connection, origin: Origin) -> GraphResult {
    info!("Adding connection {con}");

    if state.connections.contains(&con) {
        return Err(GraphError::DuplicateId(format!("connection {con}")));
    }

    let (Some(from_record), Some(to_record)) =
        (state.nodes.get(&con.from_node), state.nodes.get(&con.to_node))
    else {
        warn!("Node pair not found: {}, {}", con.from_node, con.to_node);
        return Err(GraphError::NotFound(format!(
            "node pair {}, {}",
            con.from_node, con.to_node
        )));
    };

    let (Some(from_iface), Some(to_iface)) = (
        from_record.node.find_interface(&con.from_interface),
        to_record.node.find_interface(&con.to_interface),
    ) else {
        warn!(
            "Interface pair not found: {} -> {}",
            con.from_interface, con.to_interface
        );
        return Err(GraphError::NotFound(format!(
            "interface pair {}, {}",
            con.from_interface, con.to_interface
        )));
    };

    let orientation = validate::check_directions(from_iface.direction(), to_iface.direction())
        .inspect_err(|e| warn!("{e}"))?;

    let (con, src_type, dst_type) = match orientation {
        Orientation::Forward => (con, from_iface.value_type(), to_iface.value_type()),
        Orientation::Reversed => (con.reversed(), to_iface.value_type(), from_iface.value_type()),
    };

    if orientation == Orientation::Reversed && state.connections.contains(&con) {
        return Err(GraphError::DuplicateId(format!("connection {con}")));
    }

    if !validate::accepts(dst_type, src_type) {
        warn!("Interface types do not match: {src_type} -> {dst_type}");
        return Err(GraphError::InvalidType(format!(
            "{dst_type} input does not accept {src_type}"
        )));
    }

    if validate::is_connection_circular(&state.nodes, &con) {
        warn!("Attempted connection {con} is circular");
        return Err(GraphError::CircularConnection(con.to_string()));
    }

    // Validation is complete; everything below commits.
    let from_node = Arc::clone(&state.nodes[&con.from_node].node);
    let to_node = Arc::clone(&state.nodes[&con.to_node].node);
    let mut evicted = Vec::new();

    for (node_id, node, iface_name) in [
        (&con.from_node, &from_node, &con.from_interface),
        (&con.to_node, &to_node, &con.to_interface),
    ] {
        let Some(iface) = node.find_interface(iface_name) else {
            continue;
        };
        if let Some(set) = state
            .nodes
            .get_mut(node_id)
            .and_then(|record| record.state.connections_mut(iface_name))
        {
            iface.add_connection(set, con.clone(), &mut evicted);
        }
    }

    for old in &evicted {
        debug!("Evicting connection {old} from capped interface");
        let _ = remove_connection_locked(state, old, origin);
    }

    state.connections.insert(con.clone());
    state.touch();
    state.emit(|a| a.emit_add_connection(&con, origin));

    Ok(())
}

fn remove_connection_locked(state: &mut GraphState, con: &Connection, origin: Origin) -> GraphResult {
    info!("Removing connection {con}");

    if !state.connections.shift_remove(con) {
        return Err(GraphError::NotFound(format!("connection {con}")));
    }

    for (node_id, iface_name) in [
        (&con.from_node, &con.from_interface),
        (&con.to_node, &con.to_interface),
    ] {
        let Some(record) = state.nodes.get_mut(node_id.as_str()) else {
            continue;
        };
        let node = Arc::clone(&record.node);
        let (Some(iface), Some(set)) = (
            node.find_interface(iface_name),
            record.state.connections_mut(iface_name),
        ) else {
            continue;
        };
        iface.remove_connection(set, con);
    }

    state.touch();
    state.emit(|a| a.emit_remove_connection(con, origin));

    Ok(())
}
