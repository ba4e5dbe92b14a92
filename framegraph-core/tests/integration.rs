//! Integration Tests for the Graph Core
//!
//! These tests drive the manager and the scheduler together through the
//! public API, using a counting node to observe how often each node runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};

use framegraph_core::graph::{
    interface_map, Adapter, Connection, GraphManager, ImageHandle, InterfaceMap, Interface, Node,
    NodeRegistry, NodeState, NodeTraits, Options, Origin, TextureHandle, Value, ValueType,
};
use framegraph_core::nodes::{register_probe, ProbeBoard};
use framegraph_core::scheduler::{Execution, FrameContext, FrameScheduler, RenderLoop};
use framegraph_core::GraphError;

type Counts = Arc<Mutex<HashMap<String, usize>>>;

/// Sums its inputs plus one and counts executions under its `name` option.
struct Counter {
    interfaces: InterfaceMap,
    counts: Counts,
}

impl Node for Counter {
    fn type_name(&self) -> &str {
        "counter"
    }

    fn interfaces(&self) -> &InterfaceMap {
        &self.interfaces
    }

    fn default_options(&self) -> Options {
        let mut options = Options::new();
        options.insert("name".into(), json!("counter"));
        options.insert("must_run".into(), json!(false));
        options
    }

    fn test_option(&self, key: &str, value: &mut JsonValue) -> bool {
        key == "must_run" && value.is_boolean()
    }

    fn prepare(&self, _ctx: &FrameContext, state: &NodeState) -> NodeTraits {
        NodeTraits {
            must_run: state.option_or("must_run", false),
        }
    }

    fn execute(&self, exec: &mut Execution<'_>, state: &NodeState) {
        let a = exec.input_or("a", 0.0);
        let b = exec.input_or("b", 0.0);

        let name: String = state.option_or("name", String::new());
        *self.counts.lock().entry(name).or_default() += 1;

        exec.set_output("res", a + b + 1.0);
    }
}

/// Drops record the name of the thread they ran on.
struct Tracked {
    interfaces: InterfaceMap,
    prepared: Arc<AtomicBool>,
    dropped_on: Arc<Mutex<Option<String>>>,
}

impl Node for Tracked {
    fn type_name(&self) -> &str {
        "tracked"
    }

    fn interfaces(&self) -> &InterfaceMap {
        &self.interfaces
    }

    fn test_option(&self, _key: &str, _value: &mut JsonValue) -> bool {
        false
    }

    fn prepare(&self, _ctx: &FrameContext, _state: &NodeState) -> NodeTraits {
        self.prepared.store(true, Ordering::SeqCst);
        NodeTraits::default()
    }

    fn execute(&self, _exec: &mut Execution<'_>, _state: &NodeState) {}
}

impl Drop for Tracked {
    fn drop(&mut self) {
        let name = thread::current().name().map(str::to_owned);
        *self.dropped_on.lock() = name;
    }
}

#[derive(Clone, Default)]
struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }
}

impl Adapter for Events {
    fn emit_add_node(&self, type_name: &str, id: &str, options: &Options, origin: Origin) {
        self.0.lock().push(format!(
            "add_node {type_name} {id} {} from {origin}",
            JsonValue::Object(options.clone())
        ));
    }

    fn emit_remove_node(&self, id: &str, origin: Origin) {
        self.0.lock().push(format!("remove_node {id} from {origin}"));
    }

    fn emit_update_node(&self, id: &str, options: &Options, origin: Origin) {
        self.0.lock().push(format!(
            "update_node {id} {} from {origin}",
            JsonValue::Object(options.clone())
        ));
    }

    fn emit_add_connection(&self, con: &Connection, origin: Origin) {
        self.0.lock().push(format!("add_connection {con} from {origin}"));
    }

    fn emit_remove_connection(&self, con: &Connection, origin: Origin) {
        self.0.lock().push(format!("remove_connection {con} from {origin}"));
    }
}

struct Fixture {
    graph: Arc<GraphManager>,
    counts: Counts,
    events: Events,
}

impl Fixture {
    fn new() -> Self {
        let counts = Counts::default();
        let mut registry = NodeRegistry::with_builtin_nodes();

        let shared = Arc::clone(&counts);
        registry.register("counter", move || {
            Arc::new(Counter {
                interfaces: interface_map([
                    Interface::input("a", ValueType::Real),
                    Interface::input("b", ValueType::Real),
                    Interface::output("res", ValueType::Real),
                ]),
                counts: Arc::clone(&shared),
            })
        });

        let graph = Arc::new(GraphManager::new(Arc::new(registry)));
        let events = Events::default();
        graph.add_adapter(Box::new(events.clone()));

        Self {
            graph,
            counts,
            events,
        }
    }

    fn counter(&self, id: &str, must_run: bool) {
        self.graph
            .add_node("counter", id, &json!({"name": id, "must_run": must_run}), Origin::LOCAL)
            .unwrap();
    }

    fn connect(&self, from: &str, to: &str, input: &str) -> Result<(), GraphError> {
        self.graph
            .add_connection(Connection::new(from, "res", to, input), Origin::LOCAL)
    }

    fn count(&self, id: &str) -> usize {
        self.counts.lock().get(id).copied().unwrap_or(0)
    }

    fn scheduler(&self) -> FrameScheduler {
        FrameScheduler::new(Arc::clone(&self.graph), Duration::from_millis(20))
    }
}

/// Test that a new node starts from its defaults with the given options merged in.
#[test]
fn add_node_merges_defaults_and_overrides() {
    let fx = Fixture::new();
    fx.graph
        .add_node("sinus_source", "wave", &json!({"speed": 2.0, "bogus": 1}), Origin(3))
        .unwrap();

    let config = fx.graph.get_config();
    let options = &config.nodes[0].options;
    assert_eq!(options["name"], json!("Sinus source"));
    assert_eq!(options["size"], json!(1.0));
    assert_eq!(options["speed"], json!(2.0));
    assert!(!options.contains_key("bogus"));

    // The notification carries the resolved options and the origin.
    let events = fx.events.take();
    assert_eq!(events.len(), 1);
    assert!(events[0].starts_with("add_node sinus_source wave"));
    assert!(events[0].contains("\"speed\":2.0"));
    assert!(events[0].ends_with("from 3"));
}

/// Test that a duplicate id is rejected without touching the graph.
#[test]
fn duplicate_node_id_leaves_graph_unchanged() {
    let fx = Fixture::new();
    fx.counter("a", false);
    fx.events.take();

    let err = fx
        .graph
        .add_node("math_real", "a", &json!({}), Origin::LOCAL)
        .unwrap_err();
    assert_eq!(err.code(), "duplicate_id");
    assert_eq!(fx.graph.node_count(), 1);
    assert_eq!(fx.graph.get_config().nodes[0].type_name, "counter");
    assert!(fx.events.take().is_empty());
}

/// Test that an unknown node type is reported as an invalid type.
#[test]
fn unknown_node_type_is_rejected() {
    let fx = Fixture::new();
    let err = fx
        .graph
        .add_node("teleporter", "t", &json!({}), Origin::LOCAL)
        .unwrap_err();
    assert_eq!(err.code(), "invalid_type");
    assert_eq!(fx.graph.node_count(), 0);
}

/// Test that closing a cycle is refused and the connection set is unchanged.
#[test]
fn closing_a_cycle_is_rejected() {
    let fx = Fixture::new();
    for id in ["a", "b", "c"] {
        fx.counter(id, false);
    }
    fx.connect("a", "b", "a").unwrap();
    fx.connect("b", "c", "a").unwrap();
    let before = fx.graph.get_config();
    fx.events.take();

    let err = fx.connect("c", "a", "a").unwrap_err();
    assert_eq!(err.code(), "circular_connection");
    assert_eq!(fx.graph.get_config(), before);
    assert!(fx.events.take().is_empty());

    // A self-loop is the shortest cycle.
    assert_eq!(fx.connect("a", "a", "b").unwrap_err().code(), "circular_connection");
}

/// Test that an input-first connection is stored output-first.
#[test]
fn reversed_connection_is_normalized() {
    let fx = Fixture::new();
    fx.counter("a", false);
    fx.counter("b", false);

    fx.graph
        .add_connection(Connection::new("b", "a", "a", "res"), Origin::LOCAL)
        .unwrap();

    let expected = Connection::new("a", "res", "b", "a");
    assert!(fx.graph.contains_connection(&expected));
    assert_eq!(fx.graph.get_config().connections, vec![expected.clone()]);

    // The same edge given in the stored order is now a duplicate.
    let err = fx.graph.add_connection(expected, Origin::LOCAL).unwrap_err();
    assert_eq!(err.code(), "duplicate_id");
}

/// Test that mismatched directions and value types are rejected.
#[test]
fn incompatible_endpoints_are_invalid_type() {
    let fx = Fixture::new();
    fx.counter("a", false);
    fx.counter("b", false);
    fx.graph
        .add_node("vec2", "v", &json!({}), Origin::LOCAL)
        .unwrap();

    let err = fx
        .graph
        .add_connection(Connection::new("a", "res", "b", "res"), Origin::LOCAL)
        .unwrap_err();
    assert_eq!(err.code(), "invalid_type");

    let err = fx.connect("v", "a", "a").unwrap_err();
    assert_eq!(err.code(), "invalid_type");

    let err = fx.connect("a", "b", "missing").unwrap_err();
    assert_eq!(err.code(), "not_found");
    assert_eq!(fx.graph.connection_count(), 0);
}

/// Test that connecting to a full input evicts the old edge first.
#[test]
fn full_input_evicts_oldest_connection() {
    let fx = Fixture::new();
    for id in ["a", "b", "c"] {
        fx.counter(id, false);
    }
    fx.connect("a", "c", "a").unwrap();
    fx.events.take();

    fx.connect("b", "c", "a").unwrap();

    assert_eq!(
        fx.events.take(),
        vec![
            "remove_connection a:res -> c:a from -1".to_string(),
            "add_connection b:res -> c:a from -1".to_string(),
        ]
    );
    assert_eq!(
        fx.graph.get_config().connections,
        vec![Connection::new("b", "res", "c", "a")]
    );
}

/// Test that removing a node first removes each of its connections.
#[test]
fn remove_node_tears_down_connections_first() {
    let fx = Fixture::new();
    for id in ["a", "b", "c", "d"] {
        fx.counter(id, false);
    }
    fx.connect("a", "b", "a").unwrap();
    fx.connect("b", "c", "a").unwrap();
    fx.connect("b", "d", "b").unwrap();
    fx.events.take();

    fx.graph.remove_node("b", Origin(7)).unwrap();

    let events = fx.events.take();
    assert_eq!(events.len(), 4);
    assert!(events[..3]
        .iter()
        .all(|e| e.starts_with("remove_connection") && e.ends_with("from 7")));
    assert_eq!(events[3], "remove_node b from 7");

    assert_eq!(fx.graph.node_count(), 3);
    assert_eq!(fx.graph.connection_count(), 0);
    assert_eq!(
        fx.graph.remove_node("b", Origin::LOCAL).unwrap_err().code(),
        "not_found"
    );
}

/// Test that an update keeps only accepted keys and reports exactly those.
#[test]
fn update_node_filters_options() {
    let fx = Fixture::new();
    fx.graph
        .add_node("math_real", "m", &json!({}), Origin::LOCAL)
        .unwrap();
    fx.events.take();

    fx.graph
        .update_node(
            "m",
            &json!({"operation": "mul", "bogus": true, "b": 3}),
            Origin(1),
        )
        .unwrap();

    let events = fx.events.take();
    assert_eq!(events.len(), 1);
    assert!(events[0].contains("\"operation\":\"mul\""));
    assert!(events[0].contains("\"b\":3"));
    assert!(!events[0].contains("bogus"));

    let options = fx.graph.get_config().nodes[0].options.clone();
    assert_eq!(options["operation"], json!("mul"));
    assert_eq!(options["b"], json!(3));
    assert!(!options.contains_key("bogus"));

    let err = fx
        .graph
        .update_node("m", &json!("mul"), Origin::LOCAL)
        .unwrap_err();
    assert_eq!(err.code(), "invalid_options");
}

/// Test that a saved configuration loads back into an identical graph.
#[test]
fn config_round_trips() {
    let fx = Fixture::new();
    fx.graph
        .add_node("sinus_source", "wave", &json!({"speed": 4.0}), Origin::LOCAL)
        .unwrap();
    fx.graph
        .add_node("math_real", "sum", &json!({"operation": "max"}), Origin::LOCAL)
        .unwrap();
    fx.graph
        .add_node("probe", "out", &json!({"name": "out"}), Origin::LOCAL)
        .unwrap();
    fx.graph
        .add_connection(Connection::new("wave", "res", "sum", "a"), Origin::LOCAL)
        .unwrap();
    fx.graph
        .add_connection(Connection::new("sum", "res", "out", "value"), Origin::LOCAL)
        .unwrap();

    let config = fx.graph.get_config();
    let document = serde_json::to_value(&config).unwrap();

    let copy = Fixture::new();
    let report = copy.graph.set_config_json(&document).unwrap();
    assert!(report.is_complete());
    assert_eq!(report.nodes_added, 3);
    assert_eq!(report.connections_added, 2);
    assert_eq!(copy.graph.get_config(), config);
}

/// Test that a partially invalid configuration loads what it can.
#[test]
fn set_config_skips_invalid_entries() {
    let fx = Fixture::new();
    let document = json!({
        "nodes": [
            {"id": "a", "type": "counter"},
            {"id": "b", "type": "nonexistent"},
            {"id": "c", "type": "counter"}
        ],
        "connections": [
            {"from_node": "a", "from_interface": "res", "to_node": "c", "to_interface": "a"},
            {"from_node": "b", "from_interface": "res", "to_node": "c", "to_interface": "b"}
        ]
    });

    let report = fx.graph.set_config_json(&document).unwrap();
    assert_eq!(report.nodes_added, 2);
    assert_eq!(report.connections_added, 1);
    let codes: Vec<_> = report.rejected.iter().map(GraphError::code).collect();
    assert_eq!(codes, ["invalid_type", "not_found"]);

    let err = fx.graph.set_config_json(&json!({"nodes": 5})).unwrap_err();
    assert_eq!(err.code(), "malformed_payload");
}

/// Test that a diamond executes its shared source exactly once per tick.
#[test]
fn diamond_executes_each_node_once() {
    let fx = Fixture::new();
    fx.counter("a", false);
    fx.counter("b", false);
    fx.counter("c", false);
    fx.counter("d", true);
    fx.connect("a", "b", "a").unwrap();
    fx.connect("a", "c", "a").unwrap();
    fx.connect("b", "d", "a").unwrap();
    fx.connect("c", "d", "b").unwrap();

    let mut scheduler = fx.scheduler();
    let report = scheduler.tick();

    assert_eq!(report.must_run, 1);
    assert_eq!(report.executed, ["a", "b", "c", "d"]);
    for id in ["a", "b", "c", "d"] {
        assert_eq!(fx.count(id), 1, "node {id}");
    }

    scheduler.tick();
    assert_eq!(fx.count("a"), 2);
}

/// Test that only must-run nodes and their upstream execute.
#[test]
fn must_run_drives_execution() {
    let fx = Fixture::new();
    fx.counter("lonely_sink", true);
    fx.counter("idle", false);
    fx.counter("source", false);
    fx.counter("sink", true);
    fx.connect("source", "sink", "a").unwrap();

    let mut scheduler = fx.scheduler();
    for _ in 0..3 {
        scheduler.tick();
    }

    assert_eq!(fx.count("lonely_sink"), 3);
    assert_eq!(fx.count("source"), 3);
    assert_eq!(fx.count("sink"), 3);
    assert_eq!(fx.count("idle"), 0);
}

/// Test that values flow from a source through math into a probe.
#[test]
fn probe_observes_computed_value() {
    let board = ProbeBoard::default();
    let mut registry = NodeRegistry::with_builtin_nodes();
    register_probe(&mut registry, Arc::clone(&board));
    let graph = Arc::new(GraphManager::new(Arc::new(registry)));

    graph
        .add_node("sinus_source", "wave", &json!({"speed": 0.0, "center": 2.0}), Origin::LOCAL)
        .unwrap();
    graph
        .add_node("math_real", "scale", &json!({"operation": "mul", "b": 3.0}), Origin::LOCAL)
        .unwrap();
    graph
        .add_node("probe", "out", &json!({"name": "out"}), Origin::LOCAL)
        .unwrap();
    graph
        .add_connection(Connection::new("wave", "res", "scale", "a"), Origin::LOCAL)
        .unwrap();
    graph
        .add_connection(Connection::new("scale", "res", "out", "value"), Origin::LOCAL)
        .unwrap();

    let mut scheduler = FrameScheduler::new(graph, Duration::from_millis(20));
    let ctx = FrameContext::new(5, Duration::from_secs(1), Duration::from_millis(20));
    scheduler.tick_with(&ctx);

    let reading = *board.get("out").unwrap();
    assert_eq!(reading.frame, 5);
    assert_eq!(reading.value, Some(Value::Real(6.0)));
}

/// Test that edits after a snapshot do not leak into the running tick.
#[test]
fn snapshot_isolates_tick_from_later_edits() {
    let fx = Fixture::new();
    fx.counter("a", true);

    let snapshot = fx.graph.snapshot();
    fx.graph.remove_node("a", Origin::LOCAL).unwrap();
    fx.counter("b", true);

    assert!(snapshot.contains_key("a"));
    assert!(!snapshot.contains_key("b"));

    let ctx = FrameContext::new(0, Duration::ZERO, Duration::from_millis(20));
    let mut exec = Execution::new(&ctx, &snapshot);
    exec.run("a");
    assert!(exec.has_executed("a"));
    assert_eq!(fx.count("a"), 1);
}

/// Test that a removed node is destroyed on the render thread.
#[test]
fn removed_node_is_dropped_on_render_thread() {
    let prepared = Arc::new(AtomicBool::new(false));
    let dropped_on = Arc::new(Mutex::new(None));

    let mut registry = NodeRegistry::new();
    {
        let prepared = Arc::clone(&prepared);
        let dropped_on = Arc::clone(&dropped_on);
        registry.register("tracked", move || {
            Arc::new(Tracked {
                interfaces: InterfaceMap::new(),
                prepared: Arc::clone(&prepared),
                dropped_on: Arc::clone(&dropped_on),
            })
        });
    }
    let graph = Arc::new(GraphManager::new(Arc::new(registry)));
    graph
        .add_node("tracked", "t", &json!({}), Origin::LOCAL)
        .unwrap();

    let render = RenderLoop::spawn(Arc::clone(&graph), 200.0).unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    while !prepared.load(Ordering::SeqCst) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert!(prepared.load(Ordering::SeqCst));

    graph.remove_node("t", Origin::LOCAL).unwrap();
    render.stop();

    assert_eq!(dropped_on.lock().as_deref(), Some("render"));
}

/// Test that the graph can be edited while the render thread ticks.
#[test]
fn concurrent_edits_during_render() {
    let fx = Fixture::new();
    fx.counter("sink", true);

    let render = RenderLoop::spawn(Arc::clone(&fx.graph), 1000.0).unwrap();

    for round in 0..200 {
        let id = format!("n{round}");
        fx.counter(&id, false);
        fx.connect(&id, "sink", "a").unwrap();
        if round % 3 == 0 {
            fx.graph.remove_node(&id, Origin::LOCAL).unwrap();
        }
    }

    thread::sleep(Duration::from_millis(20));
    let frames = render.stop();
    assert!(frames > 0);
    assert!(fx.count("sink") > 0);

    // Each new edge evicted the previous one on the capped input.
    assert!(fx.graph.connection_count() <= 1);
}

/// Publishes a fixed value on `res`.
struct Constant {
    interfaces: InterfaceMap,
    value: Value,
}

impl Node for Constant {
    fn type_name(&self) -> &str {
        "constant"
    }

    fn interfaces(&self) -> &InterfaceMap {
        &self.interfaces
    }

    fn test_option(&self, _key: &str, _value: &mut JsonValue) -> bool {
        false
    }

    fn execute(&self, exec: &mut Execution<'_>, _state: &NodeState) {
        exec.set_output("res", self.value);
    }
}

/// Must-run sink storing what arrives on `in` under its `name` option.
struct Collect {
    interfaces: InterfaceMap,
    seen: Arc<Mutex<HashMap<String, Option<Value>>>>,
}

impl Node for Collect {
    fn type_name(&self) -> &str {
        "collect"
    }

    fn interfaces(&self) -> &InterfaceMap {
        &self.interfaces
    }

    fn test_option(&self, _key: &str, _value: &mut JsonValue) -> bool {
        false
    }

    fn prepare(&self, _ctx: &FrameContext, _state: &NodeState) -> NodeTraits {
        NodeTraits::must_run()
    }

    fn execute(&self, exec: &mut Execution<'_>, state: &NodeState) {
        let value = exec.input("in");
        let name: String = state.option_or("name", String::new());
        self.seen.lock().insert(name, value);
    }
}

/// Test that inputs read accepted sources of another type converted.
#[test]
fn inputs_convert_widened_sources() {
    let seen = Arc::new(Mutex::new(HashMap::new()));
    let texture = TextureHandle {
        id: 9,
        width: 1920,
        height: 1080,
    };

    let mut registry = NodeRegistry::new();
    let producers = [
        ("const_integer", ValueType::Integer, Value::Integer(7)),
        ("const_real", ValueType::Real, Value::Real(-2.25)),
        ("const_texture", ValueType::Texture, Value::Texture(texture)),
    ];
    for (type_name, value_type, value) in producers {
        registry.register(type_name, move || {
            Arc::new(Constant {
                interfaces: interface_map([Interface::output("res", value_type)]),
                value,
            })
        });
    }
    for (type_name, value_type) in [
        ("collect_real", ValueType::Real),
        ("collect_integer", ValueType::Integer),
        ("collect_image", ValueType::Image),
        ("collect_texture", ValueType::Texture),
    ] {
        let seen = Arc::clone(&seen);
        registry.register(type_name, move || {
            Arc::new(Collect {
                interfaces: interface_map([Interface::input("in", value_type)]),
                seen: Arc::clone(&seen),
            })
        });
    }
    let graph = Arc::new(GraphManager::new(Arc::new(registry)));

    let add = |type_name: &str, id: &str| {
        graph
            .add_node(type_name, id, &json!({"name": id}), Origin::LOCAL)
            .unwrap();
    };
    add("const_integer", "int");
    add("const_real", "real");
    add("const_texture", "tex");
    add("collect_real", "as_real");
    add("collect_integer", "as_integer");
    add("collect_image", "as_image");
    add("collect_texture", "tex_only");

    for (from, to) in [("int", "as_real"), ("real", "as_integer"), ("tex", "as_image")] {
        graph
            .add_connection(Connection::new(from, "res", to, "in"), Origin::LOCAL)
            .unwrap();
    }

    let err = graph
        .add_connection(Connection::new("int", "res", "tex_only", "in"), Origin::LOCAL)
        .unwrap_err();
    assert_eq!(err.code(), "invalid_type");

    let mut scheduler = FrameScheduler::new(graph, Duration::from_millis(20));
    scheduler.tick();

    let seen = seen.lock();
    assert_eq!(seen["as_real"], Some(Value::Real(7.0)));
    assert_eq!(seen["as_integer"], Some(Value::Integer(-3)));
    assert_eq!(
        seen["as_image"],
        Some(Value::Image(ImageHandle {
            id: 9,
            width: 1920,
            height: 1080,
        }))
    );
    assert_eq!(seen["tex_only"], None);
}
