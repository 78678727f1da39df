use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// One extracted value, carried in the column matching its path's data type.
///
/// `Text` and `String` differ only in expected length and downstream indexing
/// strategy; extraction treats them identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TypedValue {
    String(String),
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Json(Value),
}

impl TypedValue {
    /// Ordering between two values of the same column. `Json` values only
    /// support equality, never ranges; mixed columns never compare.
    pub fn compare(&self, other: &TypedValue) -> Option<Ordering> {
        match (self, other) {
            (TypedValue::String(a), TypedValue::String(b)) => Some(a.cmp(b)),
            (TypedValue::Text(a), TypedValue::Text(b)) => Some(a.cmp(b)),
            (TypedValue::Int(a), TypedValue::Int(b)) => Some(a.cmp(b)),
            (TypedValue::Float(a), TypedValue::Float(b)) => a.partial_cmp(b),
            (TypedValue::Bool(a), TypedValue::Bool(b)) => Some(a.cmp(b)),
            (TypedValue::Date(a), TypedValue::Date(b)) => Some(a.cmp(b)),
            (TypedValue::DateTime(a), TypedValue::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn equals(&self, other: &TypedValue) -> bool {
        match (self, other) {
            (TypedValue::Json(a), TypedValue::Json(b)) => a == b,
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }
}

/// A typed index row, uniquely keyed by `(entry_id, path_id, idx)`.
///
/// For `Cardinality::Many` one row exists per array element with `idx`
/// preserving array order; `Cardinality::One` rows always sit at `idx = 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocValue {
    pub entry_id: String,
    pub path_id: String,
    pub idx: u32,
    pub value: TypedValue,
}

/// A reference index row pointing at another entry, same keying and
/// cardinality handling as [`DocValue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocRef {
    pub entry_id: String,
    pub path_id: String,
    pub idx: u32,
    pub target_entry_id: String,
}
