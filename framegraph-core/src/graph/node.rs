//! Graph Nodes
//!
//! This module defines the node contract and the per-instance state stored
//! alongside each node in the graph.
//!
//! A node instance is immutable from the graph's point of view: its type tag
//! and interfaces never change. Everything a client can edit (the option bag
//! and the connections) lives in [`NodeState`], which is cheap to copy into a
//! tick snapshot while the node itself is shared behind an `Arc`.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use super::connection::{ConnectionMap, ConnectionSet};
use super::interface::{Interface, InterfaceMap};
use crate::scheduler::{Execution, FrameContext};

/// A node's option bag.
pub type Options = serde_json::Map<String, JsonValue>;

/// What a node reports about itself while being prepared for a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeTraits {
    /// The node has external side effects and must execute this tick even if
    /// nothing consumes its outputs.
    pub must_run: bool,
}

impl NodeTraits {
    pub fn must_run() -> Self {
        Self { must_run: true }
    }
}

/// A polymorphic unit of computation in the graph.
///
/// Implementations must be `Send + Sync`: the same instance is shared between
/// the persistent graph (control thread) and the tick snapshot (render thread).
/// Any mutable per-instance state must use interior mutability.
pub trait Node: Send + Sync {
    /// The type tag this node was registered under.
    fn type_name(&self) -> &str;

    /// All interfaces exposed by this node.
    fn interfaces(&self) -> &InterfaceMap;

    fn find_interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces().get(name)
    }

    /// Options a freshly created node starts with.
    fn default_options(&self) -> Options {
        Options::new()
    }

    /// Validate a single option. The validator may normalize `value` in place
    /// (clamping, flooring); the normalized value is what gets stored.
    fn test_option(&self, key: &str, value: &mut JsonValue) -> bool;

    /// Called once per tick on every snapshotted node, before any execution.
    fn prepare(&self, _ctx: &FrameContext, _state: &NodeState) -> NodeTraits {
        NodeTraits::default()
    }

    /// Compute this node's outputs for the current tick.
    ///
    /// Inputs are read through `exec`, which executes upstream producers on
    /// demand. Outputs are written with [`Execution::set_output`].
    fn execute(&self, exec: &mut Execution<'_>, state: &NodeState);

    /// Called once per tick on every snapshotted node, executed or not.
    fn complete(&self, _ctx: &FrameContext) {}
}

/// Editable state of a node: options and attached connections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeState {
    options: Options,
    connections: ConnectionMap,
}

impl NodeState {
    /// Create a state with an empty connection set for every interface.
    pub fn new(options: Options, interfaces: &InterfaceMap) -> Self {
        let connections = interfaces
            .keys()
            .map(|name| (name.clone(), ConnectionSet::new()))
            .collect();

        Self {
            options,
            connections,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// Read a typed option. Returns `None` when the key is absent or has the
    /// wrong shape.
    pub fn option<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.options
            .get(key)
            .and_then(|value| T::deserialize(value).ok())
    }

    /// Read a typed option, falling back when absent or malformed.
    pub fn option_or<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        self.option(key).unwrap_or(fallback)
    }

    /// Connections attached to an interface.
    pub fn connections(&self, interface: &str) -> Option<&ConnectionSet> {
        self.connections.get(interface)
    }

    pub fn connections_mut(&mut self, interface: &str) -> Option<&mut ConnectionSet> {
        self.connections.get_mut(interface)
    }

    pub fn connection_map(&self) -> &ConnectionMap {
        &self.connections
    }

    /// Total number of connections across all interfaces.
    pub fn connection_count(&self) -> usize {
        self.connections.values().map(ConnectionSet::len).sum()
    }
}

/// A node instance together with its editable state.
#[derive(Clone)]
pub struct NodeRecord {
    pub node: Arc<dyn Node>,
    pub state: NodeState,
}

impl NodeRecord {
    pub fn new(node: Arc<dyn Node>, options: Options) -> Self {
        let state = NodeState::new(options, node.interfaces());
        Self { node, state }
    }
}

/// Node records keyed by node id, in insertion order.
pub type NodeTable = IndexMap<String, NodeRecord>;

impl fmt::Debug for NodeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRecord")
            .field("type", &self.node.type_name())
            .field("state", &self.state)
            .finish()
    }
}
