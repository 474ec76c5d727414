//! Output-boundary serialization helper.
//!
//! Every component result leaves the core as plain JSON. `to_clean_json`
//! serializes through serde and then walks the tree once, replacing
//! anything a JSON consumer cannot hold (non-finite floats, negative
//! zero) with a safe representation.

use crate::error::InsightResult;
use serde::Serialize;
use serde_json::Value;

pub fn to_clean_json<T: Serialize>(value: &T) -> InsightResult<Value> {
    Ok(sanitize(serde_json::to_value(value)?))
}

pub fn sanitize(value: Value) -> Value {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if !f.is_finite() => Value::Null,
            Some(f) if f == 0.0 && f.is_sign_negative() => {
                // -0.0 serializes as "-0.0"; normalize it.
                Value::from(0.0)
            }
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, sanitize(v))).collect())
        }
        other => other,
    }
}
