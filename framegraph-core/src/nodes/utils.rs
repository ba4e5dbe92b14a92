//! Composite constructors: `vec2` from two numbers, `rect` from two vectors.

use std::sync::Arc;

use serde_json::{json, Value as JsonValue};

use crate::graph::options::{validate_real, validate_vec2};
use crate::graph::{
    interface_map, Interface, InterfaceMap, Node, NodeRegistry, NodeState, Options, Rect,
    ValueType,
};
use crate::scheduler::Execution;

pub struct Vec2Node {
    interfaces: InterfaceMap,
}

impl Vec2Node {
    pub fn new() -> Self {
        Self {
            interfaces: interface_map([
                Interface::input("x", ValueType::Real),
                Interface::input("y", ValueType::Real),
                Interface::output("res", ValueType::Vec2),
            ]),
        }
    }
}

impl Default for Vec2Node {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for Vec2Node {
    fn type_name(&self) -> &str {
        "vec2"
    }

    fn interfaces(&self) -> &InterfaceMap {
        &self.interfaces
    }

    fn default_options(&self) -> Options {
        let mut options = Options::new();
        options.insert("name".into(), json!("Vector"));
        options.insert("x".into(), json!(0.0));
        options.insert("y".into(), json!(0.0));
        options
    }

    fn test_option(&self, key: &str, value: &mut JsonValue) -> bool {
        matches!(key, "x" | "y") && validate_real(value, None, None)
    }

    fn execute(&self, exec: &mut Execution<'_>, state: &NodeState) {
        let x = exec.input_or("x", state.option_or("x", 0.0));
        let y = exec.input_or("y", state.option_or("y", 0.0));
        exec.set_output("res", [x, y]);
    }
}

pub struct RectNode {
    interfaces: InterfaceMap,
}

impl RectNode {
    pub fn new() -> Self {
        Self {
            interfaces: interface_map([
                Interface::input("pos", ValueType::Vec2),
                Interface::input("size", ValueType::Vec2),
                Interface::output("res", ValueType::Rect),
            ]),
        }
    }
}

impl Default for RectNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for RectNode {
    fn type_name(&self) -> &str {
        "rect"
    }

    fn interfaces(&self) -> &InterfaceMap {
        &self.interfaces
    }

    fn default_options(&self) -> Options {
        let rect = Rect::default();
        let mut options = Options::new();
        options.insert("name".into(), json!("Rectangle"));
        options.insert("pos".into(), json!(rect.pos));
        options.insert("size".into(), json!(rect.size));
        options
    }

    fn test_option(&self, key: &str, value: &mut JsonValue) -> bool {
        match key {
            "pos" => validate_vec2(value, None, None),
            "size" => validate_vec2(value, Some([0.0, 0.0]), None),
            _ => false,
        }
    }

    fn execute(&self, exec: &mut Execution<'_>, state: &NodeState) {
        let fallback = Rect::default();
        let pos = exec.input_or("pos", state.option_or("pos", fallback.pos));
        let size = exec.input_or("size", state.option_or("size", fallback.size));
        exec.set_output("res", Rect { pos, size });
    }
}

pub(crate) fn register(registry: &mut NodeRegistry) {
    registry.register("vec2", || Arc::new(Vec2Node::new()));
    registry.register("rect", || Arc::new(RectNode::new()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_size_is_non_negative() {
        let node = RectNode::new();
        let mut size = json!([-2.0, 3.0]);
        assert!(node.test_option("size", &mut size));
        assert_eq!(size, json!([0.0, 3.0]));
    }

    #[test]
    fn vec2_rejects_unknown_keys() {
        let node = Vec2Node::new();
        assert!(node.test_option("x", &mut json!(1.5)));
        assert!(!node.test_option("z", &mut json!(1.5)));
        assert!(!node.test_option("y", &mut json!("up")));
    }
}
