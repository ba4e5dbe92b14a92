//! Node Interfaces
//!
//! An interface is a named, typed, directional attachment point on a node.
//! Interfaces are fixed for the lifetime of a node; the connections attached
//! to them live in the node's [`NodeState`](super::NodeState), so the
//! interface itself stays immutable and can be shared with a tick snapshot.

use indexmap::IndexMap;

use super::connection::{Connection, ConnectionSet};
use super::value::ValueType;

/// Direction of data flow through an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

/// A typed attachment point on a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    name: String,
    direction: Direction,
    value_type: ValueType,
    /// `None` means unbounded fan-out.
    max_connections: Option<usize>,
}

impl Interface {
    /// An input interface. Inputs hold a single connection unless widened
    /// with [`Interface::with_max_connections`].
    pub fn input(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Input,
            value_type,
            max_connections: Some(1),
        }
    }

    /// An output interface with unbounded fan-out.
    pub fn output(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Output,
            value_type,
            max_connections: None,
        }
    }

    /// Override the connection cap. A cap of zero is treated as one.
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max.max(1));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn max_connections(&self) -> Option<usize> {
        self.max_connections
    }

    /// Whether this interface accepts values produced as `other`.
    pub fn accepts(&self, other: ValueType) -> bool {
        self.value_type.accepts(other)
    }

    /// Attach `con` to this interface's connection set.
    ///
    /// When the set is already at its cap, the oldest connections are evicted
    /// into `removed` so the caller can tear them down everywhere else.
    pub fn add_connection(
        &self,
        connections: &mut ConnectionSet,
        con: Connection,
        removed: &mut Vec<Connection>,
    ) {
        if let Some(max) = self.max_connections {
            while connections.len() >= max {
                match connections.pop_oldest() {
                    Some(evicted) => removed.push(evicted),
                    None => break,
                }
            }
        }

        connections.push(con);
    }

    /// Detach `con`. Returns whether it was attached.
    pub fn remove_connection(&self, connections: &mut ConnectionSet, con: &Connection) -> bool {
        connections.remove(con)
    }
}

/// Interfaces of a node, keyed by name, in declaration order.
pub type InterfaceMap = IndexMap<String, Interface>;

/// Build an [`InterfaceMap`] from a list of interfaces.
pub fn interface_map(interfaces: impl IntoIterator<Item = Interface>) -> InterfaceMap {
    interfaces
        .into_iter()
        .map(|iface| (iface.name.clone(), iface))
        .collect()
}
