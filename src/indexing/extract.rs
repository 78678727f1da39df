//! Payload value resolution and type coercion.
//!
//! A dotted `full_path` is walked through nested objects; intermediate
//! arrays are mapped over and flattened in document order, so a leaf under
//! a many-valued embedding resolves to the concatenated values of every
//! element.

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::indexing::rows::TypedValue;
use crate::schema::types::DataType;

/// Resolves a dotted path against a payload. Returns `None` when the path
/// is missing or resolves only to null; a multi-hit resolution (crossing
/// arrays) comes back as a single flattened array.
pub(crate) fn resolve_path_value(payload: &Value, full_path: &str) -> Option<Value> {
    let segments: Vec<&str> = full_path.split('.').collect();
    let mut found = collect(payload, &segments);
    found.retain(|v| !v.is_null());

    match found.len() {
        0 => None,
        1 => Some(found.remove(0)),
        _ => {
            let mut items = Vec::new();
            for value in found {
                match value {
                    Value::Array(elements) => items.extend(elements),
                    other => items.push(other),
                }
            }
            Some(Value::Array(items))
        }
    }
}

fn collect(value: &Value, segments: &[&str]) -> Vec<Value> {
    if segments.is_empty() {
        return vec![value.clone()];
    }
    match value {
        Value::Object(map) => map
            .get(segments[0])
            .map(|v| collect(v, &segments[1..]))
            .unwrap_or_default(),
        Value::Array(elements) => elements
            .iter()
            .flat_map(|element| collect(element, segments))
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Converts one payload value into the typed column matching `data_type`.
/// No silent coercion across kinds: a float is not an int, a number is not
/// a string. Mismatches come back as an error message for the caller to
/// log and skip.
pub(crate) fn coerce(value: &Value, data_type: DataType) -> Result<TypedValue, String> {
    match data_type {
        DataType::String => value
            .as_str()
            .map(|s| TypedValue::String(s.to_string()))
            .ok_or_else(|| format!("expected string, got {}", value_kind(value))),
        DataType::Text => value
            .as_str()
            .map(|s| TypedValue::Text(s.to_string()))
            .ok_or_else(|| format!("expected string, got {}", value_kind(value))),
        DataType::Int => value
            .as_i64()
            .map(TypedValue::Int)
            .ok_or_else(|| format!("expected integer, got {}", value_kind(value))),
        DataType::Float => value
            .as_f64()
            .map(TypedValue::Float)
            .ok_or_else(|| format!("expected number, got {}", value_kind(value))),
        DataType::Bool => value
            .as_bool()
            .map(TypedValue::Bool)
            .ok_or_else(|| format!("expected boolean, got {}", value_kind(value))),
        DataType::Date => {
            let s = value
                .as_str()
                .ok_or_else(|| format!("expected date string, got {}", value_kind(value)))?;
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(TypedValue::Date)
                .map_err(|e| format!("invalid date '{}': {}", s, e))
        }
        DataType::DateTime => {
            let s = value
                .as_str()
                .ok_or_else(|| format!("expected datetime string, got {}", value_kind(value)))?;
            if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
                return Ok(TypedValue::DateTime(dt.with_timezone(&Utc)));
            }
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|naive| TypedValue::DateTime(Utc.from_utc_datetime(&naive)))
                .map_err(|e| format!("invalid datetime '{}': {}", s, e))
        }
        DataType::Json => Ok(TypedValue::Json(value.clone())),
        DataType::Ref | DataType::Blueprint => {
            Err(format!("{:?} paths do not use value columns", data_type))
        }
    }
}
