use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;

use super::extract::{coerce, resolve_path_value, value_kind};
use super::rows::{DocRef, DocValue};
use crate::db_operations::DbOperations;
use crate::entry::Entry;
use crate::infrastructure::message_bus::{EntryIndexed, MessageBus};
use crate::schema::types::{Cardinality, DataType, Path, SchemaError};

/// Row counts produced by one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub value_rows: usize,
    pub ref_rows: usize,
}

/// Projects entry payloads into typed index rows.
///
/// Works off a resolved path list; it never consults the schema map itself,
/// so callers decide how fresh the resolution is (always through the
/// resolved-path cache in practice).
pub struct IndexingEngine {
    db_ops: Arc<DbOperations>,
    message_bus: Arc<MessageBus>,
}

impl IndexingEngine {
    pub fn new(db_ops: Arc<DbOperations>, message_bus: Arc<MessageBus>) -> Self {
        Self {
            db_ops,
            message_bus,
        }
    }

    /// Replaces the entry's index rows from its current payload.
    ///
    /// Missing and null values emit no row. A value that does not match its
    /// path's declared type or cardinality skips that path with a log line
    /// and never aborts the rest of the entry. The row replacement itself is
    /// one atomic unit.
    pub fn sync_entry(
        &self,
        entry: &Entry,
        resolved_paths: &[Path],
    ) -> Result<SyncOutcome, SchemaError> {
        let mut values: Vec<DocValue> = Vec::new();
        let mut refs: Vec<DocRef> = Vec::new();

        for path in resolved_paths
            .iter()
            .filter(|p| p.is_live() && p.is_indexed && p.data_type.is_indexable())
        {
            let Some(resolved) = resolve_path_value(&entry.payload, &path.full_path) else {
                continue;
            };

            let elements: Vec<&Value> = match path.cardinality {
                Cardinality::One => {
                    if resolved.is_array() {
                        warn!(
                            "Entry {}: path '{}' expects one value but resolved to an array; skipping",
                            entry.id, path.full_path
                        );
                        continue;
                    }
                    vec![&resolved]
                }
                Cardinality::Many => match &resolved {
                    Value::Array(items) => items.iter().filter(|v| !v.is_null()).collect(),
                    other => {
                        warn!(
                            "Entry {}: path '{}' expects an array but resolved to {}; skipping",
                            entry.id,
                            path.full_path,
                            value_kind(other)
                        );
                        continue;
                    }
                },
            };

            match rows_for_path(&entry.id, path, &elements) {
                Ok((mut path_values, mut path_refs)) => {
                    values.append(&mut path_values);
                    refs.append(&mut path_refs);
                }
                Err(reason) => {
                    warn!(
                        "Entry {}: path '{}' skipped: {}",
                        entry.id, path.full_path, reason
                    );
                }
            }
        }

        let outcome = SyncOutcome {
            value_rows: values.len(),
            ref_rows: refs.len(),
        };
        self.db_ops.replace_entry_rows(&entry.id, &values, &refs)?;

        if let Err(e) = self.message_bus.publish(EntryIndexed {
            entry_id: entry.id.clone(),
            blueprint_id: entry.blueprint_id.clone(),
            value_rows: outcome.value_rows,
            ref_rows: outcome.ref_rows,
        }) {
            warn!("Failed to publish EntryIndexed: {}", e);
        }
        info!(
            "Indexed entry {}: {} value rows, {} ref rows",
            entry.id, outcome.value_rows, outcome.ref_rows
        );
        Ok(outcome)
    }

    /// Removes every index row of an entry. Invoked from entry deletion;
    /// leaves no orphan rows behind.
    pub fn delete_entry_rows(&self, entry_id: &str) -> Result<(), SchemaError> {
        self.db_ops.delete_entry_rows(entry_id)
    }

    /// Re-syncs a batch of entries against one resolved path list. Returns
    /// the number of entries processed.
    pub fn reindex_entries(
        &self,
        resolved_paths: &[Path],
        entries: &[Entry],
    ) -> Result<usize, SchemaError> {
        for entry in entries {
            self.sync_entry(entry, resolved_paths)?;
        }
        Ok(entries.len())
    }
}

/// Builds the rows for one path. All-or-nothing: if any element mismatches
/// the declared type the whole path is skipped, keeping `idx` values
/// contiguous and order-preserving.
fn rows_for_path(
    entry_id: &str,
    path: &Path,
    elements: &[&Value],
) -> Result<(Vec<DocValue>, Vec<DocRef>), String> {
    let mut values = Vec::new();
    let mut refs = Vec::new();

    for (idx, element) in elements.iter().enumerate() {
        let idx = idx as u32;
        if path.data_type == DataType::Ref {
            let target = element.as_str().ok_or_else(|| {
                format!("expected entry id string, got {}", value_kind(element))
            })?;
            refs.push(DocRef {
                entry_id: entry_id.to_string(),
                path_id: path.id.clone(),
                idx,
                target_entry_id: target.to_string(),
            });
        } else {
            let typed = coerce(element, path.data_type)?;
            values.push(DocValue {
                entry_id: entry_id.to_string(),
                path_id: path.id.clone(),
                idx,
                value: typed,
            });
        }
    }

    Ok((values, refs))
}
