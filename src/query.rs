//! Read-only access to index rows.
//!
//! Simple equality/range predicates over one indexed path; no planning, no
//! joins. Rows are scanned and filtered by path id. Path ids are unique per
//! blueprint, so the resolved path list is the only schema input needed.

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::db_operations::DbOperations;
use crate::indexing::extract::coerce;
use crate::indexing::rows::TypedValue;
use crate::schema::types::{DataType, Path, SchemaError};

/// Predicate operators supported by the index read layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl FilterOp {
    fn matches(self, row: &TypedValue, needle: &TypedValue) -> bool {
        match self {
            FilterOp::Eq => row.equals(needle),
            FilterOp::Ne => !row.equals(needle),
            FilterOp::Lt => row.compare(needle) == Some(Ordering::Less),
            FilterOp::Lte => matches!(
                row.compare(needle),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::Gt => row.compare(needle) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(
                row.compare(needle),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }
}

/// Entry ids whose index rows under `full_path` satisfy the predicate.
/// Sorted and deduplicated; a many-valued path matches when any of its rows
/// does.
pub(crate) fn find_entry_ids(
    db_ops: &DbOperations,
    resolved_paths: &[Path],
    full_path: &str,
    op: FilterOp,
    value: &Value,
) -> Result<Vec<String>, SchemaError> {
    let path = resolved_paths
        .iter()
        .find(|p| p.is_live() && p.full_path == full_path)
        .ok_or_else(|| SchemaError::InvalidField(format!("Unknown path '{}'", full_path)))?;
    if !path.is_indexed {
        return Err(SchemaError::InvalidField(format!(
            "Path '{}' is not indexed",
            full_path
        )));
    }

    let mut matches: BTreeSet<String> = BTreeSet::new();

    if path.data_type == DataType::Ref {
        if !matches!(op, FilterOp::Eq | FilterOp::Ne) {
            return Err(SchemaError::InvalidData(
                "Reference paths only support equality predicates".to_string(),
            ));
        }
        let needle = value.as_str().ok_or_else(|| {
            SchemaError::InvalidData("Reference predicates take an entry id string".to_string())
        })?;
        for row in db_ops.scan_doc_refs()? {
            if row.path_id != path.id {
                continue;
            }
            let hit = row.target_entry_id == needle;
            if (op == FilterOp::Eq && hit) || (op == FilterOp::Ne && !hit) {
                matches.insert(row.entry_id);
            }
        }
    } else {
        let needle = coerce(value, path.data_type).map_err(|reason| {
            SchemaError::InvalidData(format!(
                "Predicate value does not match path '{}': {}",
                full_path, reason
            ))
        })?;
        for row in db_ops.scan_doc_values()? {
            if row.path_id != path.id {
                continue;
            }
            if op.matches(&row.value, &needle) {
                matches.insert(row.entry_id);
            }
        }
    }

    Ok(matches.into_iter().collect())
}
