//! Demand-Driven Execution
//!
//! [`Execution`] is the per-tick memo table. It records which nodes have run
//! and caches every output written this tick. A node reading an input pulls
//! the producing node through [`Execution::resolve`], which executes the
//! producer first if it has not run yet.
//!
//! The graph is acyclic by construction: cycles are rejected when a
//! connection is added and never checked again here. The only guard is the
//! explicit stack of nodes currently executing. Finding a producer already on
//! that stack means the invariant was broken upstream, and the tick aborts
//! with a panic.

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;
use tracing::{trace, warn};

use super::FrameContext;
use crate::graph::{Direction, FromValue, NodeRecord, NodeTable, Value};

/// Per-tick execution state over a snapshot of the graph.
pub struct Execution<'a> {
    ctx: &'a FrameContext,
    nodes: &'a NodeTable,
    executed: HashSet<&'a str>,
    order: Vec<&'a str>,
    outputs: HashMap<(&'a str, &'a str), Value>,
    stack: Vec<&'a str>,
}

impl<'a> Execution<'a> {
    pub fn new(ctx: &'a FrameContext, nodes: &'a NodeTable) -> Self {
        Self {
            ctx,
            nodes,
            executed: HashSet::with_capacity(nodes.len()),
            order: Vec::with_capacity(nodes.len()),
            outputs: HashMap::new(),
            stack: Vec::new(),
        }
    }

    pub fn context(&self) -> &'a FrameContext {
        self.ctx
    }

    /// Execute `id` unless it already ran this tick.
    pub fn run(&mut self, id: &str) {
        let nodes = self.nodes;
        if let Some((id, record)) = nodes.get_key_value(id) {
            self.execute_node(id, record);
        }
    }

    pub fn has_executed(&self, id: &str) -> bool {
        self.executed.contains(id)
    }

    /// Node ids in the order they executed.
    pub fn executed_nodes(&self) -> &[&'a str] {
        &self.order
    }

    /// Values arriving on an input of the node currently executing.
    ///
    /// Producers that have not run yet this tick are executed first. Each
    /// value is converted to the input's declared type. Connections whose
    /// producer or output is missing are skipped.
    pub fn resolve(&mut self, interface: &str) -> SmallVec<[Value; 1]> {
        let mut values = SmallVec::new();
        let nodes = self.nodes;

        let Some(current) = self.stack.last().copied() else {
            warn!("resolve({interface}) called outside of a node execution");
            return values;
        };
        let Some(record) = nodes.get(current) else {
            return values;
        };

        let Some(iface) = record.node.find_interface(interface) else {
            warn!("Node {current} has no interface {interface}");
            return values;
        };
        if iface.direction() != Direction::Input {
            warn!("Node {current} tried to resolve output interface {interface}");
            return values;
        }
        let Some(connections) = record.state.connections(interface) else {
            return values;
        };

        for con in connections {
            let Some((producer_id, producer)) = nodes.get_key_value(con.from_node.as_str()) else {
                continue;
            };

            if self.stack.contains(&producer_id.as_str()) {
                panic!(
                    "dependency cycle through {producer_id} while executing {current}; \
                     the graph must be acyclic"
                );
            }

            self.execute_node(producer_id, producer);

            let key = (con.from_node.as_str(), con.from_interface.as_str());
            if let Some(value) = self.outputs.get(&key) {
                if let Some(value) = value.convert_to(iface.value_type()) {
                    values.push(value);
                }
            }
        }

        values
    }

    /// The first value arriving on an input, if any.
    pub fn input(&mut self, interface: &str) -> Option<Value> {
        self.resolve(interface).into_iter().next()
    }

    /// The first value arriving on an input, or `fallback` when the input is
    /// unconnected or the value cannot be read as `T`.
    pub fn input_or<T: FromValue>(&mut self, interface: &str, fallback: T) -> T {
        self.input(interface)
            .and_then(T::from_value)
            .unwrap_or(fallback)
    }

    /// Publish a value on an output of the node currently executing.
    pub fn set_output(&mut self, interface: &str, value: impl Into<Value>) {
        let value = value.into();
        let nodes = self.nodes;

        let Some(current) = self.stack.last().copied() else {
            warn!("set_output({interface}) called outside of a node execution");
            return;
        };
        let Some(record) = nodes.get(current) else {
            return;
        };
        let Some((name, iface)) = record.node.interfaces().get_key_value(interface) else {
            warn!("Node {current} has no interface {interface}");
            return;
        };
        if iface.direction() != Direction::Output {
            warn!("Node {current} tried to write input interface {interface}");
            return;
        }

        match value.convert_to(iface.value_type()) {
            Some(value) => {
                self.outputs.insert((current, name.as_str()), value);
            }
            None => warn!(
                "Node {current} wrote {} to {} output {interface}",
                value.value_type(),
                iface.value_type()
            ),
        }
    }

    /// A value written this tick by `node_id` on `interface`.
    pub fn output(&self, node_id: &str, interface: &str) -> Option<Value> {
        self.outputs.get(&(node_id, interface)).copied()
    }

    fn execute_node(&mut self, id: &'a str, record: &'a NodeRecord) {
        if !self.executed.insert(id) {
            return;
        }

        trace!("Executing {} node {id}", record.node.type_name());

        self.stack.push(id);
        record.node.execute(self, &record.state);
        self.stack.pop();
        self.order.push(id);
    }
}
