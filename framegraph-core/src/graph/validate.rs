//! Connection Validation
//!
//! Pure checks used by the manager before any graph state is touched:
//! direction, type compatibility, acyclicity, and the options every node
//! accepts regardless of its type.
//!
//! # Cycle Check
//!
//! For a candidate edge `src -> dst` we walk backward from `src` along the
//! connections attached to input interfaces. Reaching `dst` means `dst`
//! already feeds `src`, so the new edge would close a loop. Nodes whose
//! upstream has been fully explored go into a `cleared` set local to the
//! call, which keeps the walk linear in the number of existing edges even
//! when many paths converge on the same node.

use std::collections::HashSet;

use serde_json::Value as JsonValue;

use super::connection::Connection;
use super::interface::Direction;
use super::node::NodeTable;
use super::options::validate_string;
use super::value::ValueType;
use crate::error::{GraphError, GraphResult};

/// How a requested connection lines up with the interface directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// `from` is an output and `to` an input.
    Forward,
    /// The caller supplied the endpoints input-first; swap before committing.
    Reversed,
}

/// Check that exactly one endpoint is an output and the other an input.
pub fn check_directions(from: Direction, to: Direction) -> GraphResult<Orientation> {
    match (from, to) {
        (Direction::Output, Direction::Input) => Ok(Orientation::Forward),
        (Direction::Input, Direction::Output) => Ok(Orientation::Reversed),
        (from, to) => Err(GraphError::InvalidType(format!(
            "interface directions do not match: {} -> {}",
            from.as_str(),
            to.as_str()
        ))),
    }
}

/// Whether an input of type `dst` accepts an output of type `src`.
pub fn accepts(dst: ValueType, src: ValueType) -> bool {
    dst.accepts(src)
}

/// Whether committing `candidate` (already oriented output -> input) would
/// create a cycle in `nodes`.
pub fn is_connection_circular(nodes: &NodeTable, candidate: &Connection) -> bool {
    let mut cleared = HashSet::new();
    walk_upstream(nodes, &mut cleared, &candidate.to_node, &candidate.from_node)
}

fn walk_upstream<'a>(
    nodes: &'a NodeTable,
    cleared: &mut HashSet<&'a str>,
    target: &str,
    node_id: &'a str,
) -> bool {
    if cleared.contains(node_id) {
        return false;
    }

    if node_id == target {
        return true;
    }

    if let Some(record) = nodes.get(node_id) {
        for (name, iface) in record.node.interfaces() {
            if iface.direction() == Direction::Output {
                continue;
            }

            let Some(connections) = record.state.connections(name) else {
                continue;
            };

            for con in connections {
                if walk_upstream(nodes, cleared, target, &con.from_node) {
                    return true;
                }
            }
        }
    }

    cleared.insert(node_id);
    false
}

/// Options accepted on every node: `name` (string) and `position` (two numbers).
pub fn is_valid_common_option(key: &str, value: &JsonValue) -> bool {
    match key {
        "name" => validate_string(value),
        "position" => value
            .as_array()
            .is_some_and(|items| items.len() == 2 && items.iter().all(JsonValue::is_number)),
        _ => false,
    }
}
