use super::DbOperations;
use crate::indexing::rows::{DocRef, DocValue};
use crate::schema::types::SchemaError;
use sled::Transactional;

/// Index rows are keyed `"{entry_id}|{path_id}|{idx}"` with a zero-padded
/// idx so a prefix scan on the entry id yields rows in array order.
pub(crate) fn index_row_key(entry_id: &str, path_id: &str, idx: u32) -> String {
    format!("{}|{}|{:010}", entry_id, path_id, idx)
}

fn entry_prefix(entry_id: &str) -> String {
    format!("{}|", entry_id)
}

impl DbOperations {
    /// Replaces every index row of an entry with the given set, atomically
    /// across both row tables. A reader never observes a partially replaced
    /// entry.
    pub fn replace_entry_rows(
        &self,
        entry_id: &str,
        values: &[DocValue],
        refs: &[DocRef],
    ) -> Result<(), SchemaError> {
        let prefix = entry_prefix(entry_id);
        let old_value_keys = self.keys_with_prefix(&self.doc_values_tree, &prefix)?;
        let old_ref_keys = self.keys_with_prefix(&self.doc_refs_tree, &prefix)?;

        let mut value_rows = Vec::with_capacity(values.len());
        for row in values {
            let bytes = serde_json::to_vec(row)
                .map_err(|e| SchemaError::InvalidData(format!("Serialization failed: {}", e)))?;
            value_rows.push((index_row_key(entry_id, &row.path_id, row.idx), bytes));
        }
        let mut ref_rows = Vec::with_capacity(refs.len());
        for row in refs {
            let bytes = serde_json::to_vec(row)
                .map_err(|e| SchemaError::InvalidData(format!("Serialization failed: {}", e)))?;
            ref_rows.push((index_row_key(entry_id, &row.path_id, row.idx), bytes));
        }

        let result: sled::transaction::TransactionResult<(), ()> =
            (&self.doc_values_tree, &self.doc_refs_tree).transaction(|(tx_values, tx_refs)| {
                for key in &old_value_keys {
                    tx_values.remove(key.as_slice())?;
                }
                for key in &old_ref_keys {
                    tx_refs.remove(key.as_slice())?;
                }
                for (key, bytes) in &value_rows {
                    tx_values.insert(key.as_bytes(), bytes.clone())?;
                }
                for (key, bytes) in &ref_rows {
                    tx_refs.insert(key.as_bytes(), bytes.clone())?;
                }
                Ok(())
            });
        result.map_err(|e| {
            SchemaError::InvalidData(format!("Index row replacement failed: {:?}", e))
        })?;

        self.doc_values_tree
            .flush()
            .map_err(|e| SchemaError::InvalidData(format!("Flush failed: {}", e)))?;
        self.doc_refs_tree
            .flush()
            .map_err(|e| SchemaError::InvalidData(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    /// Removes every index row of an entry. Same code path entry deletion
    /// uses; leaves zero rows referencing the entry id.
    pub fn delete_entry_rows(&self, entry_id: &str) -> Result<(), SchemaError> {
        self.replace_entry_rows(entry_id, &[], &[])
    }

    /// All rows of an entry, in `(path_id, idx)` key order.
    pub fn rows_for_entry(
        &self,
        entry_id: &str,
    ) -> Result<(Vec<DocValue>, Vec<DocRef>), SchemaError> {
        let prefix = entry_prefix(entry_id);
        let mut values = Vec::new();
        for result in self.doc_values_tree.scan_prefix(prefix.as_bytes()) {
            let (_, bytes) = result
                .map_err(|e| SchemaError::InvalidData(format!("Failed to scan prefix: {}", e)))?;
            let row: DocValue = serde_json::from_slice(&bytes)
                .map_err(|e| SchemaError::InvalidData(format!("Deserialization failed: {}", e)))?;
            values.push(row);
        }
        let mut refs = Vec::new();
        for result in self.doc_refs_tree.scan_prefix(prefix.as_bytes()) {
            let (_, bytes) = result
                .map_err(|e| SchemaError::InvalidData(format!("Failed to scan prefix: {}", e)))?;
            let row: DocRef = serde_json::from_slice(&bytes)
                .map_err(|e| SchemaError::InvalidData(format!("Deserialization failed: {}", e)))?;
            refs.push(row);
        }
        Ok((values, refs))
    }

    /// Removes every row for a given path across all entries, used when a
    /// path's `is_indexed` flag is turned off or the path is compacted away.
    pub fn delete_rows_for_path(&self, path_id: &str) -> Result<usize, SchemaError> {
        let mut removed = 0;
        for (key, row) in self.list_items_in_tree::<DocValue>(&self.doc_values_tree)? {
            if row.path_id == path_id {
                self.delete_from_tree(&self.doc_values_tree, &key)?;
                removed += 1;
            }
        }
        for (key, row) in self.list_items_in_tree::<DocRef>(&self.doc_refs_tree)? {
            if row.path_id == path_id {
                self.delete_from_tree(&self.doc_refs_tree, &key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Full scan of the value-row table, for the query layer.
    pub fn scan_doc_values(&self) -> Result<Vec<DocValue>, SchemaError> {
        Ok(self
            .list_items_in_tree::<DocValue>(&self.doc_values_tree)?
            .into_iter()
            .map(|(_, row)| row)
            .collect())
    }

    /// Full scan of the reference-row table, for the query layer.
    pub fn scan_doc_refs(&self) -> Result<Vec<DocRef>, SchemaError> {
        Ok(self
            .list_items_in_tree::<DocRef>(&self.doc_refs_tree)?
            .into_iter()
            .map(|(_, row)| row)
            .collect())
    }
}
