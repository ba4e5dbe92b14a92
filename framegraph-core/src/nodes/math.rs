//! Math Nodes
//!
//! Binary arithmetic (`math_*`) and linear interpolation (`lerp_*`) over the
//! numeric value types. Each unconnected input falls back to the option of
//! the same name.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::graph::options::{validate_enum, validate_real, validate_rect, validate_vec2};
use crate::graph::{
    interface_map, FromValue, Interface, InterfaceMap, Node, NodeRegistry, NodeState, Options,
    Rect, Value, ValueType,
};
use crate::scheduler::Execution;

/// A value type the math nodes can operate on.
pub trait Operand:
    Copy + Default + FromValue + Into<Value> + DeserializeOwned + Send + Sync + 'static
{
    const VALUE_TYPE: ValueType;

    fn validate(value: &mut JsonValue) -> bool;

    fn lerp(a: Self, b: Self, t: f64) -> Self;

    fn to_json(self) -> JsonValue;
}

/// An operand supporting the `math_*` operations.
pub trait Arithmetic: Operand {
    fn apply(op: Operation, a: Self, b: Self) -> Self;
}

impl Operand for f64 {
    const VALUE_TYPE: ValueType = ValueType::Real;

    fn validate(value: &mut JsonValue) -> bool {
        validate_real(value, None, None)
    }

    fn lerp(a: Self, b: Self, t: f64) -> Self {
        a + (b - a) * t
    }

    fn to_json(self) -> JsonValue {
        json!(self)
    }
}

impl Arithmetic for f64 {
    fn apply(op: Operation, a: Self, b: Self) -> Self {
        match op {
            Operation::Add => a + b,
            Operation::Sub => a - b,
            Operation::Mul => a * b,
            Operation::Min => a.min(b),
            Operation::Max => a.max(b),
        }
    }
}

impl Operand for [f64; 2] {
    const VALUE_TYPE: ValueType = ValueType::Vec2;

    fn validate(value: &mut JsonValue) -> bool {
        validate_vec2(value, None, None)
    }

    fn lerp(a: Self, b: Self, t: f64) -> Self {
        [f64::lerp(a[0], b[0], t), f64::lerp(a[1], b[1], t)]
    }

    fn to_json(self) -> JsonValue {
        json!(self)
    }
}

impl Arithmetic for [f64; 2] {
    fn apply(op: Operation, a: Self, b: Self) -> Self {
        [f64::apply(op, a[0], b[0]), f64::apply(op, a[1], b[1])]
    }
}

impl Operand for Rect {
    const VALUE_TYPE: ValueType = ValueType::Rect;

    fn validate(value: &mut JsonValue) -> bool {
        validate_rect(value)
    }

    fn lerp(a: Self, b: Self, t: f64) -> Self {
        Rect {
            pos: <[f64; 2]>::lerp(a.pos, b.pos, t),
            size: <[f64; 2]>::lerp(a.size, b.size, t),
        }
    }

    fn to_json(self) -> JsonValue {
        json!({"pos": self.pos, "size": self.size})
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    Add,
    Sub,
    Mul,
    Min,
    Max,
}

impl Operation {
    pub const NAMES: &'static [&'static str] = &["add", "sub", "mul", "min", "max"];
}

/// `res = a <operation> b`
pub struct MathNode<T> {
    type_name: &'static str,
    display_name: &'static str,
    interfaces: InterfaceMap,
    _operand: PhantomData<fn() -> T>,
}

impl<T: Arithmetic> MathNode<T> {
    pub fn new(type_name: &'static str, display_name: &'static str) -> Self {
        Self {
            type_name,
            display_name,
            interfaces: interface_map([
                Interface::input("a", T::VALUE_TYPE),
                Interface::input("b", T::VALUE_TYPE),
                Interface::output("res", T::VALUE_TYPE),
            ]),
            _operand: PhantomData,
        }
    }
}

impl<T: Arithmetic> Node for MathNode<T> {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn interfaces(&self) -> &InterfaceMap {
        &self.interfaces
    }

    fn default_options(&self) -> Options {
        let mut options = Options::new();
        options.insert("name".into(), json!(self.display_name));
        options.insert("operation".into(), json!("add"));
        options.insert("a".into(), T::default().to_json());
        options.insert("b".into(), T::default().to_json());
        options
    }

    fn test_option(&self, key: &str, value: &mut JsonValue) -> bool {
        match key {
            "operation" => validate_enum(value, Operation::NAMES),
            "a" | "b" => T::validate(value),
            _ => false,
        }
    }

    fn execute(&self, exec: &mut Execution<'_>, state: &NodeState) {
        let op = state.option_or("operation", Operation::Add);
        let a = exec.input_or("a", state.option_or("a", T::default()));
        let b = exec.input_or("b", state.option_or("b", T::default()));

        exec.set_output("res", T::apply(op, a, b));
    }
}

/// `res = a + (b - a) * t`, with `t` clamped to `[0, 1]`.
pub struct LerpNode<T> {
    type_name: &'static str,
    display_name: &'static str,
    interfaces: InterfaceMap,
    _operand: PhantomData<fn() -> T>,
}

impl<T: Operand> LerpNode<T> {
    pub fn new(type_name: &'static str, display_name: &'static str) -> Self {
        Self {
            type_name,
            display_name,
            interfaces: interface_map([
                Interface::input("a", T::VALUE_TYPE),
                Interface::input("b", T::VALUE_TYPE),
                Interface::input("t", ValueType::Real),
                Interface::output("res", T::VALUE_TYPE),
            ]),
            _operand: PhantomData,
        }
    }
}

impl<T: Operand> Node for LerpNode<T> {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn interfaces(&self) -> &InterfaceMap {
        &self.interfaces
    }

    fn default_options(&self) -> Options {
        let mut options = Options::new();
        options.insert("name".into(), json!(self.display_name));
        options.insert("a".into(), T::default().to_json());
        options.insert("b".into(), T::default().to_json());
        options.insert("t".into(), json!(0.0));
        options
    }

    fn test_option(&self, key: &str, value: &mut JsonValue) -> bool {
        match key {
            "a" | "b" => T::validate(value),
            "t" => validate_real(value, Some(0.0), Some(1.0)),
            _ => false,
        }
    }

    fn execute(&self, exec: &mut Execution<'_>, state: &NodeState) {
        let a = exec.input_or("a", state.option_or("a", T::default()));
        let b = exec.input_or("b", state.option_or("b", T::default()));
        let t = exec.input_or("t", state.option_or("t", 0.0)).clamp(0.0, 1.0);

        exec.set_output("res", T::lerp(a, b, t));
    }
}

pub(crate) fn register(registry: &mut NodeRegistry) {
    registry.register("math_real", || {
        Arc::new(MathNode::<f64>::new("math_real", "Number math"))
    });
    registry.register("math_vec2", || {
        Arc::new(MathNode::<[f64; 2]>::new("math_vec2", "Vector math"))
    });
    registry.register("lerp_real", || {
        Arc::new(LerpNode::<f64>::new("lerp_real", "Number lerp"))
    });
    registry.register("lerp_vec2", || {
        Arc::new(LerpNode::<[f64; 2]>::new("lerp_vec2", "Vector lerp"))
    });
    registry.register("lerp_rect", || {
        Arc::new(LerpNode::<Rect>::new("lerp_rect", "Rectangle lerp"))
    });
}
