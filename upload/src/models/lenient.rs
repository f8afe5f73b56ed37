//! Forgiving deserializers for spreadsheet-derived values.
//!
//! Preview rows come from AI/heuristic column mapping, so a number may
//! arrive as `60`, `"60"` or `" 60 "`, and a text cell may arrive as a
//! number. Readable numbers are kept as sent, out of range or not; only
//! unreadable ones fall back to a default. Range coercion belongs to inline
//! edits (see [`crate::workflow::edit`]).

use serde::{de, Deserialize, Deserializer, Serializer};
use serde_json::Value;

use crate::workflow::edit::parse_number;

pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(de::Error::custom(format!("expected text, found {}", other))),
    }
}

pub fn opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let s = string(deserializer)?;
    let trimmed = s.trim();
    Ok(if trimmed.is_empty() { None } else { Some(trimmed.to_string()) })
}

fn number_value<E: de::Error>(value: Value) -> Result<Option<f64>, E> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) => Ok(parse_number(&s)),
        other => Err(E::custom(format!("expected a number, found {}", other))),
    }
}

pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(number_value(Value::deserialize(deserializer)?)?.unwrap_or(0.0))
}

pub fn opt_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    number_value(Value::deserialize(deserializer)?)
}

/// Missing or unreadable quantities count as one unit.
pub fn quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(number_value(Value::deserialize(deserializer)?)?.unwrap_or(1.0))
}

/// Whole numbers go out as integers (`2`, not `2.0`).
pub fn whole<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

pub fn opt_whole<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => whole(v, serializer),
        None => serializer.serialize_none(),
    }
}
