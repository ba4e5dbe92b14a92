//! Framegraph Core
//!
//! This crate provides the graph core of a real-time video compositor.
//! It implements:
//!
//! - A live-editable dataflow graph of typed nodes and connections
//! - Validation of every edit (types, directions, acyclicity)
//! - A per-frame scheduler that executes only what visible sinks need
//! - A WebSocket control transport for editor clients
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Nodes, interfaces, connections and the [`GraphManager`]
//! - `scheduler`: Tick snapshot, demand-driven execution and the render loop
//! - `nodes`: Built-in node types
//! - `transport`: WebSocket server and control protocol
//! - `error`: The [`GraphError`] taxonomy shared by all of the above
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use framegraph_core::graph::{Connection, GraphManager, NodeRegistry, Origin};
//! use framegraph_core::scheduler::FrameScheduler;
//! use serde_json::json;
//!
//! let registry = Arc::new(NodeRegistry::with_builtin_nodes());
//! let graph = Arc::new(GraphManager::new(registry));
//!
//! graph.add_node("sinus_source", "wave", &json!({"speed": 2.0}), Origin::LOCAL)?;
//! graph.add_node("probe", "out", &json!({}), Origin::LOCAL)?;
//! graph.add_connection(Connection::new("wave", "res", "out", "value"), Origin::LOCAL)?;
//!
//! let mut scheduler = FrameScheduler::new(graph, Duration::from_millis(20));
//! let report = scheduler.tick();
//! assert_eq!(report.executed, ["wave", "out"]);
//! # Ok::<(), framegraph_core::GraphError>(())
//! ```

pub mod error;
pub mod graph;
pub mod nodes;
pub mod scheduler;
pub mod transport;

pub use error::{GraphError, GraphResult};
pub use graph::{GraphManager, NodeRegistry, Origin};
pub use scheduler::{FrameScheduler, RenderLoop};
