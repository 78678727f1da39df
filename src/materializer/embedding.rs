use log::info;
use uuid::Uuid;

use super::MaterializeOutcome;
use crate::schema::types::{Blueprint, Path, SchemaError};

/// Copies an embedding target's resolved field list under the embedding
/// path's `full_path`.
///
/// The source is the target's *resolved* list (its authored fields plus its
/// own materialized copies), so embeddings-of-embeddings stay one physical
/// copy layer deep. Copies carry `embedded_root_path_id` pointing back at
/// the embedding path; their own embedding markers are stripped so a copy
/// never acts as a fresh embedding point on the host.
pub fn materialize_embedding(
    host: &mut Blueprint,
    embed_path_id: &str,
    target_resolved: &[Path],
) -> Result<MaterializeOutcome, SchemaError> {
    let embed_path = host.path(embed_path_id).ok_or_else(|| {
        SchemaError::InvalidField(format!("Embedding path {} not found", embed_path_id))
    })?;
    if !embed_path.is_embedding_point() {
        return Err(SchemaError::InvalidField(format!(
            "Path '{}' is not an embedding point",
            embed_path.full_path
        )));
    }
    let prefix = embed_path.full_path.clone();
    let host_name = host.name.clone();

    let mut outcome = MaterializeOutcome::default();
    let sources: Vec<&Path> = target_resolved.iter().filter(|p| p.is_live()).collect();

    for source in &sources {
        let target_full_path = format!("{}.{}", prefix, source.full_path);

        let existing_id = host
            .paths
            .values()
            .find(|p| {
                p.embedded_root_path_id.as_deref() == Some(embed_path_id)
                    && p.source_path_id.as_deref() == Some(source.id.as_str())
            })
            .map(|p| p.id.clone());

        if host
            .paths
            .values()
            .any(|p| p.is_live() && p.full_path == target_full_path && Some(&p.id) != existing_id.as_ref())
        {
            return Err(SchemaError::DuplicatePath(format!(
                "materializing embedding '{}' collides on '{}'",
                prefix, target_full_path
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
                    embedded_root_path_id: Some(embed_path_id.to_string()),
                    source_component_id: None,
                    source_path_id: Some(source.id.clone()),
                    tombstoned: false,
                };
                host.paths.insert(copy.id.clone(), copy);
                outcome.created += 1;
            }
        }
    }

    let live_source_ids: Vec<&str> = sources.iter().map(|p| p.id.as_str()).collect();
    for path in host.paths.values_mut() {
        if path.is_live()
            && path.embedded_root_path_id.as_deref() == Some(embed_path_id)
            && !live_source_ids.contains(&path.source_path_id.as_deref().unwrap_or(""))
        {
            path.tombstoned = true;
            outcome.removed += 1;
        }
    }

    if !outcome.is_noop() {
        info!(
            "Materialized embedding '{}' on '{}': {} created, {} updated, {} removed",
            prefix, host_name, outcome.created, outcome.updated, outcome.removed
        );
    }

    Ok(outcome)
}

/// Tombstones every copy an embedding point produced on the host.
pub fn dematerialize_embedding(host: &mut Blueprint, embed_path_id: &str) -> usize {
    let mut removed = 0;
    for path in host.paths.values_mut() {
        if path.is_live() && path.embedded_root_path_id.as_deref() == Some(embed_path_id) {
            path.tombstoned = true;
            removed += 1;
        }
    }
    removed
}
