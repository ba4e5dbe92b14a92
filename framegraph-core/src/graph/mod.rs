//! Node Graph
//!
//! This module implements the live-editable dataflow graph: typed nodes,
//! their interfaces, the connections between them, and the manager that
//! validates and applies every edit.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph where:
//!
//! - Nodes are units of computation created from a [`NodeRegistry`] by type tag
//! - Interfaces are the typed input and output points on a node
//! - Connections link one output interface to one input interface
//!
//! # Design Decisions
//!
//! 1. Connections reference nodes by string id, never by pointer. The node
//!    table is the single owner of every node; ids are resolved when a
//!    connection is traversed.
//!
//! 2. Each connection is stored twice: once in the manager's global set for
//!    duplicate checks, and once in each endpoint's [`NodeState`] so traversal
//!    during execution and cycle checks is a direct lookup.
//!
//! 3. Acyclicity is enforced when a connection is added and trusted
//!    everywhere else.

mod connection;
mod interface;
mod manager;
mod node;
pub mod options;
mod registry;
mod validate;
mod value;

pub use connection::{Connection, ConnectionMap, ConnectionSet};
pub use interface::{interface_map, Direction, Interface, InterfaceMap};
pub use manager::{Adapter, GraphConfig, GraphManager, LoadReport, NodeConfig, Origin};
pub use node::{Node, NodeRecord, NodeState, NodeTable, NodeTraits, Options};
pub use registry::{NodeFactory, NodeRegistry};
pub use validate::{accepts, check_directions, is_connection_circular, is_valid_common_option, Orientation};
pub use value::{FromValue, ImageHandle, Rect, TextureHandle, Value, ValueType};
