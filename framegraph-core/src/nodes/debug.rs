//! Debug Nodes
//!
//! `sinus_source` produces a time-varying number for exercising a graph
//! without any media input. `probe` is a must-run sink that records what it
//! receives so tests and tools can observe a running graph.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{json, Value as JsonValue};
use tracing::trace;

use crate::graph::options::{validate_bool, validate_real};
use crate::graph::{
    interface_map, Interface, InterfaceMap, Node, NodeRegistry, NodeState, NodeTraits, Options,
    Value, ValueType,
};
use crate::scheduler::{Execution, FrameContext};

/// `res = sin(t * speed) * size + center`, with `t` in seconds since start.
pub struct SinusSource {
    interfaces: InterfaceMap,
}

impl SinusSource {
    pub fn new() -> Self {
        Self {
            interfaces: interface_map([Interface::output("res", ValueType::Real)]),
        }
    }
}

impl Default for SinusSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for SinusSource {
    fn type_name(&self) -> &str {
        "sinus_source"
    }

    fn interfaces(&self) -> &InterfaceMap {
        &self.interfaces
    }

    fn default_options(&self) -> Options {
        let mut options = Options::new();
        options.insert("name".into(), json!("Sinus source"));
        options.insert("size".into(), json!(1.0));
        options.insert("center".into(), json!(0.0));
        options.insert("speed".into(), json!(0.1));
        options
    }

    fn test_option(&self, key: &str, value: &mut JsonValue) -> bool {
        matches!(key, "size" | "center" | "speed") && validate_real(value, None, None)
    }

    fn execute(&self, exec: &mut Execution<'_>, state: &NodeState) {
        let size = state.option_or("size", 1.0);
        let center = state.option_or("center", 0.0);
        let speed = state.option_or("speed", 0.1);

        let t = exec.context().seconds();
        exec.set_output("res", (t * speed).sin() * size + center);
    }
}

/// The last value a probe saw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeReading {
    pub frame: u64,
    /// `None` when the probe ran with nothing connected.
    pub value: Option<Value>,
}

/// Readings of every probe created from one registry, keyed by node name.
pub type ProbeBoard = Arc<DashMap<String, ProbeReading>>;

/// Must-run sink recording its `value` input into a [`ProbeBoard`].
///
/// The reading is stored under the node's `name` option. Setting `enabled`
/// to false turns the probe into an ordinary node that only runs when pulled.
pub struct Probe {
    interfaces: InterfaceMap,
    board: ProbeBoard,
}

impl Probe {
    pub fn new(board: ProbeBoard) -> Self {
        Self {
            interfaces: interface_map([Interface::input("value", ValueType::Real)]),
            board,
        }
    }
}

impl Node for Probe {
    fn type_name(&self) -> &str {
        "probe"
    }

    fn interfaces(&self) -> &InterfaceMap {
        &self.interfaces
    }

    fn default_options(&self) -> Options {
        let mut options = Options::new();
        options.insert("name".into(), json!("Probe"));
        options.insert("enabled".into(), json!(true));
        options
    }

    fn test_option(&self, key: &str, value: &mut JsonValue) -> bool {
        key == "enabled" && validate_bool(value)
    }

    fn prepare(&self, _ctx: &FrameContext, state: &NodeState) -> NodeTraits {
        NodeTraits {
            must_run: state.option_or("enabled", true),
        }
    }

    fn execute(&self, exec: &mut Execution<'_>, state: &NodeState) {
        let value = exec.input("value");
        let frame = exec.context().frame;
        let name: String = state.option_or("name", String::from("Probe"));

        trace!("Probe {name} read {value:?} on frame {frame}");
        self.board.insert(name, ProbeReading { frame, value });
    }
}

/// Register `probe` with readings going to `board`, replacing any earlier
/// registration.
pub fn register_probe(registry: &mut NodeRegistry, board: ProbeBoard) {
    registry.register("probe", move || Arc::new(Probe::new(Arc::clone(&board))));
}

pub(crate) fn register(registry: &mut NodeRegistry) {
    registry.register("sinus_source", || Arc::new(SinusSource::new()));
    register_probe(registry, ProbeBoard::default());
}
