//! Connections
//!
//! A connection is a value-typed edge between two `(node id, interface name)`
//! pairs. Connections never hold references to nodes; endpoints are resolved
//! through the node table whenever they are traversed.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// An edge from an output interface to an input interface.
///
/// Equality and hashing are structural over all four fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub from_node: String,
    pub from_interface: String,
    pub to_node: String,
    pub to_interface: String,
}

impl Connection {
    pub fn new(
        from_node: impl Into<String>,
        from_interface: impl Into<String>,
        to_node: impl Into<String>,
        to_interface: impl Into<String>,
    ) -> Self {
        Self {
            from_node: from_node.into(),
            from_interface: from_interface.into(),
            to_node: to_node.into(),
            to_interface: to_interface.into(),
        }
    }

    /// The same edge with its endpoints swapped.
    pub fn reversed(&self) -> Self {
        Self {
            from_node: self.to_node.clone(),
            from_interface: self.to_interface.clone(),
            to_node: self.from_node.clone(),
            to_interface: self.from_interface.clone(),
        }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.from_node, self.from_interface, self.to_node, self.to_interface
        )
    }
}

/// Connections attached to a single interface, oldest first.
///
/// Inputs usually hold a single connection, so the set is stored inline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionSet {
    connections: SmallVec<[Connection; 1]>,
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn contains(&self, con: &Connection) -> bool {
        self.connections.contains(con)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Append a connection as the newest entry.
    pub fn push(&mut self, con: Connection) {
        self.connections.push(con);
    }

    /// Remove and return the oldest connection.
    pub fn pop_oldest(&mut self) -> Option<Connection> {
        if self.connections.is_empty() {
            None
        } else {
            Some(self.connections.remove(0))
        }
    }

    /// Remove a connection. Returns whether it was present.
    pub fn remove(&mut self, con: &Connection) -> bool {
        match self.connections.iter().position(|c| c == con) {
            Some(index) => {
                self.connections.remove(index);
                true
            }
            None => false,
        }
    }
}

impl<'a> IntoIterator for &'a ConnectionSet {
    type Item = &'a Connection;
    type IntoIter = std::slice::Iter<'a, Connection>;

    fn into_iter(self) -> Self::IntoIter {
        self.connections.iter()
    }
}

/// Connection sets of a node, keyed by interface name.
pub type ConnectionMap = IndexMap<String, ConnectionSet>;
