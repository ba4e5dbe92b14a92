//! Built-in Nodes
//!
//! | Type           | Inputs            | Output      |
//! |----------------|-------------------|-------------|
//! | `math_real`    | `a`, `b`: real    | `res`: real |
//! | `math_vec2`    | `a`, `b`: vec2    | `res`: vec2 |
//! | `lerp_real`    | `a`, `b`, `t`     | `res`: real |
//! | `lerp_vec2`    | `a`, `b`, `t`     | `res`: vec2 |
//! | `lerp_rect`    | `a`, `b`, `t`     | `res`: rect |
//! | `vec2`         | `x`, `y`: real    | `res`: vec2 |
//! | `rect`         | `pos`, `size`     | `res`: rect |
//! | `sinus_source` |                   | `res`: real |
//! | `probe`        | `value`: real     |             |

pub mod debug;
pub mod math;
pub mod utils;

pub use debug::{register_probe, Probe, ProbeBoard, ProbeReading, SinusSource};
pub use math::{LerpNode, MathNode, Operation};
pub use utils::{RectNode, Vec2Node};

use crate::graph::NodeRegistry;

/// Register every built-in node type.
pub fn register_all(registry: &mut NodeRegistry) {
    math::register(registry);
    utils::register(registry);
    debug::register(registry);
}
