//! Interface Values
//!
//! The closed set of value types that can flow along a connection, and the
//! compatibility rules between them.
//!
//! # Compatibility
//!
//! An input accepts an output when the types are identical, or when they form
//! one of the declared conversion pairs:
//!
//! - `real` and `integer` widen into each other
//! - `image` accepts `texture` (a texture can be sampled as an image buffer)
//!
//! The conversion itself happens when the consuming node reads its input, see
//! [`Value::convert_to`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// The type of value carried by an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Real,
    Integer,
    Vec2,
    Rect,
    Image,
    Texture,
}

impl ValueType {
    /// Whether an input of type `self` accepts values produced as `source`.
    pub fn accepts(self, source: ValueType) -> bool {
        if self == source {
            return true;
        }

        matches!(
            (self, source),
            (ValueType::Real, ValueType::Integer)
                | (ValueType::Integer, ValueType::Real)
                | (ValueType::Image, ValueType::Texture)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Real => "real",
            ValueType::Integer => "integer",
            ValueType::Vec2 => "vec2",
            ValueType::Rect => "rect",
            ValueType::Image => "image",
            ValueType::Texture => "texture",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An axis-aligned rectangle in normalized output coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub pos: [f64; 2],
    pub size: [f64; 2],
}

impl Default for Rect {
    fn default() -> Self {
        Self {
            pos: [0.0, 0.0],
            size: [1.0, 1.0],
        }
    }
}

/// Opaque handle to a frame buffer owned by the graphics layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageHandle {
    pub id: u64,
    pub width: u32,
    pub height: u32,
}

/// Opaque handle to a sampled texture owned by the graphics layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle {
    pub id: u64,
    pub width: u32,
    pub height: u32,
}

/// A value produced by an output interface during a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Real(f64),
    Integer(i64),
    Vec2([f64; 2]),
    Rect(Rect),
    Image(ImageHandle),
    Texture(TextureHandle),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Real(_) => ValueType::Real,
            Value::Integer(_) => ValueType::Integer,
            Value::Vec2(_) => ValueType::Vec2,
            Value::Rect(_) => ValueType::Rect,
            Value::Image(_) => ValueType::Image,
            Value::Texture(_) => ValueType::Texture,
        }
    }

    /// Convert this value into `target`, following the accepted conversion pairs.
    ///
    /// Returns `None` when `target` does not accept this value's type.
    pub fn convert_to(self, target: ValueType) -> Option<Value> {
        match (self, target) {
            (v, t) if v.value_type() == t => Some(v),
            (Value::Integer(i), ValueType::Real) => Some(Value::Real(i as f64)),
            (Value::Real(r), ValueType::Integer) => Some(Value::Integer(r.floor() as i64)),
            (Value::Texture(t), ValueType::Image) => Some(Value::Image(ImageHandle {
                id: t.id,
                width: t.width,
                height: t.height,
            })),
            _ => None,
        }
    }
}

/// Extraction of a concrete Rust type from a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Option<Self>;
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Option<Self> {
        match value.convert_to(ValueType::Real)? {
            Value::Real(r) => Some(r),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Option<Self> {
        match value.convert_to(ValueType::Integer)? {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }
}

impl FromValue for [f64; 2] {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Vec2(v) => Some(v),
            _ => None,
        }
    }
}

impl FromValue for Rect {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Rect(r) => Some(r),
            _ => None,
        }
    }
}

impl FromValue for ImageHandle {
    fn from_value(value: Value) -> Option<Self> {
        match value.convert_to(ValueType::Image)? {
            Value::Image(h) => Some(h),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<[f64; 2]> for Value {
    fn from(v: [f64; 2]) -> Self {
        Value::Vec2(v)
    }
}

impl From<Rect> for Value {
    fn from(v: Rect) -> Self {
        Value::Rect(v)
    }
}
