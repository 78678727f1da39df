use log::info;
use uuid::Uuid;

use super::MaterializeOutcome;
use crate::schema::types::{Blueprint, Path, SchemaError};

/// Copies a component's authored fields into a host blueprint under a prefix.
///
/// Materialization is one level of indirection: only the component's own
/// authored paths are read, never its materialized copies. An existing copy
/// for the same source is updated in place so its id (and any index rows
/// keyed by it) survives. Copies whose source no longer exists are
/// tombstoned. Idempotent: re-running with an unchanged source changes
/// nothing.
pub fn materialize_component(
    host: &mut Blueprint,
    component: &Blueprint,
    prefix: &str,
) -> Result<MaterializeOutcome, SchemaError> {
    let mut outcome = MaterializeOutcome::default();

    let sources: Vec<Path> = component.authored_paths().cloned().collect();

    for source in &sources {
        let target_full_path = format!("{}.{}", prefix, source.full_path);

        let existing_id = host
            .paths
            .values()
            .find(|p| {
                p.source_component_id.as_deref() == Some(component.id.as_str())
                    && p.source_path_id.as_deref() == Some(source.id.as_str())
            })
            .map(|p| p.id.clone());

        if host
            .paths
            .values()
            .any(|p| p.is_live() && p.full_path == target_full_path && Some(&p.id) != existing_id.as_ref())
        {
            return Err(SchemaError::DuplicatePath(format!(
                "materializing component '{}' into '{}' collides on '{}'",
                component.name, host.name, target_full_path
            )));
        }

        match existing_id {
            Some(id) => {
                let copy = host
                    .path_mut(&id)
                    .ok_or_else(|| SchemaError::InvalidField(format!("Path {} missing", id)))?;
                let changed = copy.tombstoned
                    || copy.full_path != target_full_path
                    || copy.name != source.name
                    || copy.data_type != source.data_type
                    || copy.cardinality != source.cardinality
                    || copy.is_indexed != source.is_indexed
                    || copy.is_required != source.is_required
                    || copy.validation_rules != source.validation_rules;
                if changed {
                    copy.name = source.name.clone();
                    copy.full_path = target_full_path;
                    copy.data_type = source.data_type;
                    copy.cardinality = source.cardinality;
                    copy.is_indexed = source.is_indexed;
                    copy.is_required = source.is_required;
                    copy.validation_rules = source.validation_rules.clone();
                    copy.tombstoned = false;
                    outcome.updated += 1;
                }
            }
            None => {
                let copy = Path {
                    id: Uuid::new_v4().to_string(),
                    name: source.name.clone(),
                    full_path: target_full_path,
                    parent_id: None,
                    data_type: source.data_type,
                    cardinality: source.cardinality,
                    is_indexed: source.is_indexed,
                    is_required: source.is_required,
                    validation_rules: source.validation_rules.clone(),
                    embedded_blueprint_id: None,
                    embedded_root_path_id: None,
                    source_component_id: Some(component.id.clone()),
                    source_path_id: Some(source.id.clone()),
                    tombstoned: false,
                };
                host.paths.insert(copy.id.clone(), copy);
                outcome.created += 1;
            }
        }
    }

    // Copies whose source was deleted from the component go away with it.
    let live_source_ids: Vec<&str> = sources.iter().map(|p| p.id.as_str()).collect();
    for path in host.paths.values_mut() {
        if path.is_live()
            && path.source_component_id.as_deref() == Some(component.id.as_str())
            && !live_source_ids.contains(&path.source_path_id.as_deref().unwrap_or(""))
        {
            path.tombstoned = true;
            outcome.removed += 1;
        }
    }

    if !outcome.is_noop() {
        info!(
            "Materialized component '{}' into '{}' under '{}': {} created, {} updated, {} removed",
            component.name, host.name, prefix, outcome.created, outcome.updated, outcome.removed
        );
    }

    Ok(outcome)
}

/// Tombstones every copy a component attachment produced on the host.
pub fn dematerialize_component(host: &mut Blueprint, component_id: &str) -> usize {
    let mut removed = 0;
    for path in host.paths.values_mut() {
        if path.is_live() && path.source_component_id.as_deref() == Some(component_id) {
            path.tombstoned = true;
            removed += 1;
        }
    }
    removed
}
