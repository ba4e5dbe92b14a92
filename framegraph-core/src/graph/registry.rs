//! Node Registry
//!
//! Maps node type tags to factories. The registry is built once at startup
//! and shared with the [`GraphManager`](super::GraphManager) behind an `Arc`;
//! there is no process-wide registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::node::Node;
use crate::error::{GraphError, GraphResult};

/// Constructs a fresh node instance.
pub type NodeFactory = Box<dyn Fn() -> Arc<dyn Node> + Send + Sync>;

/// Table of known node types.
#[derive(Default)]
pub struct NodeRegistry {
    factories: BTreeMap<String, NodeFactory>,
}

impl NodeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in node type registered.
    pub fn with_builtin_nodes() -> Self {
        let mut registry = Self::new();
        crate::nodes::register_all(&mut registry);
        registry
    }

    /// Register a factory under `type_name`, replacing any previous one.
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Node> + Send + Sync + 'static,
    {
        self.factories.insert(type_name.into(), Box::new(factory));
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered type tags, sorted.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Create a node of the given type.
    ///
    /// Fails with `InvalidType` for unknown tags, and with `Internal` if the
    /// factory produced a node reporting a different tag.
    pub fn create(&self, type_name: &str) -> GraphResult<Arc<dyn Node>> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| GraphError::InvalidType(format!("unknown node type {type_name}")))?;

        let node = factory();
        if node.type_name() != type_name {
            return Err(GraphError::Internal(format!(
                "factory for {type_name} produced a {} node",
                node.type_name()
            )));
        }

        Ok(node)
    }
}
