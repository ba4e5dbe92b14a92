//! Option Validators
//!
//! Helpers used by node implementations in `test_option`. Each validator
//! checks the JSON shape and may normalize the value in place: numbers are
//! clamped into the optional range, integers are floored.

use serde_json::{Number, Value as JsonValue};

fn clamp(value: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    let value = min.map_or(value, |min| value.max(min));
    max.map_or(value, |max| value.min(max))
}

fn set_number(value: &mut JsonValue, n: f64) -> bool {
    match Number::from_f64(n) {
        Some(num) => {
            *value = JsonValue::Number(num);
            true
        }
        None => false,
    }
}

/// A finite number, clamped into `[min, max]`.
pub fn validate_real(value: &mut JsonValue, min: Option<f64>, max: Option<f64>) -> bool {
    let Some(n) = value.as_f64() else {
        return false;
    };

    if !n.is_finite() {
        return false;
    }

    let clamped = clamp(n, min, max);
    if clamped != n {
        return set_number(value, clamped);
    }
    true
}

/// A number, floored to an integer and clamped into `[min, max]`.
pub fn validate_integer(value: &mut JsonValue, min: Option<i64>, max: Option<i64>) -> bool {
    let n = match value.as_i64() {
        Some(i) => i,
        None => match value.as_f64() {
            Some(f) if f.is_finite() => f.floor() as i64,
            _ => return false,
        },
    };

    let n = min.map_or(n, |min| n.max(min));
    let n = max.map_or(n, |max| n.min(max));
    *value = JsonValue::from(n);
    true
}

pub fn validate_bool(value: &JsonValue) -> bool {
    value.is_boolean()
}

pub fn validate_string(value: &JsonValue) -> bool {
    value.is_string()
}

/// A string that is one of `allowed`.
pub fn validate_enum(value: &JsonValue, allowed: &[&str]) -> bool {
    value.as_str().is_some_and(|s| allowed.contains(&s))
}

/// A two-element numeric array, each component clamped independently.
pub fn validate_vec2(
    value: &mut JsonValue,
    min: Option<[f64; 2]>,
    max: Option<[f64; 2]>,
) -> bool {
    let Some(items) = value.as_array_mut() else {
        return false;
    };

    if items.len() != 2 {
        return false;
    }

    items.iter_mut().enumerate().all(|(axis, component)| {
        validate_real(component, min.map(|m| m[axis]), max.map(|m| m[axis]))
    })
}

/// An object with exactly `pos` and `size`, both vec2.
pub fn validate_rect(value: &mut JsonValue) -> bool {
    let Some(obj) = value.as_object_mut() else {
        return false;
    };

    if obj.len() != 2 {
        return false;
    }

    let pos_ok = obj
        .get_mut("pos")
        .is_some_and(|pos| validate_vec2(pos, None, None));
    let size_ok = obj
        .get_mut("size")
        .is_some_and(|size| validate_vec2(size, None, None));

    pos_ok && size_ok
}
