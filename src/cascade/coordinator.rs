use log::{error, info, warn};
use std::collections::HashSet;

use super::{CascadeFailure, CascadeReport};
use crate::infrastructure::message_bus::{CascadeCompleted, StructureChanged};
use crate::materializer::{materialize_component, materialize_embedding};
use crate::schema::core::SchemaCore;
use crate::schema::types::{Blueprint, ComponentAttachment, Path, SchemaError};

impl SchemaCore {
    /// Common tail of every structural mutation: persist the changed
    /// blueprint, invalidate its cache entry, notify observers, schedule its
    /// own reindex and walk the dependent graph.
    pub(crate) fn touch_structure(
        &self,
        blueprint_id: &str,
        source: &str,
    ) -> Result<CascadeReport, SchemaError> {
        let snapshot = self.get_blueprint(blueprint_id)?;
        self.persist_blueprint(&snapshot)?;
        self.cache.invalidate(blueprint_id);

        if let Err(e) = self.message_bus.publish(StructureChanged {
            blueprint_id: blueprint_id.to_string(),
            source: source.to_string(),
        }) {
            warn!("Failed to publish StructureChanged: {}", e);
        }

        let mut report = CascadeReport::default();
        if self.schedule_schema_reindex(blueprint_id)? {
            report.reindex_scheduled.push(blueprint_id.to_string());
        }

        let mut visited = HashSet::new();
        report.merge(self.propagate_structure_change(blueprint_id, &mut visited)?);

        if let Err(e) = self.message_bus.publish(CascadeCompleted {
            origin_blueprint_id: blueprint_id.to_string(),
            visited: report.visited.clone(),
            failed: report
                .failures
                .iter()
                .map(|f| f.blueprint_id.clone())
                .collect(),
        }) {
            warn!("Failed to publish CascadeCompleted: {}", e);
        }

        info!(
            "Structure change on {} via {}: {} visited, {} reindex task(s), {} failure(s)",
            blueprint_id,
            source,
            report.visited.len(),
            report.reindex_scheduled.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Walks the dependent graph of a changed blueprint, re-materializing
    /// every copy sourced from it.
    ///
    /// The visited set deduplicates node processing: a blueprint already in
    /// the set is not processed again, which terminates diamonds and cycles.
    /// Materialization itself runs per dependency edge, so a diamond's sink
    /// still refreshes its copies from both arms. A failing dependent is
    /// recorded and skipped; its siblings continue.
    pub fn propagate_structure_change(
        &self,
        blueprint_id: &str,
        visited: &mut HashSet<String>,
    ) -> Result<CascadeReport, SchemaError> {
        let mut report = CascadeReport::default();
        if !visited.insert(blueprint_id.to_string()) {
            return Ok(report);
        }
        report.visited.push(blueprint_id.to_string());

        let dependents = self.direct_dependents(blueprint_id)?;
        if dependents.is_empty() {
            return Ok(report);
        }

        let source = self.get_blueprint(blueprint_id)?;
        let source_resolved = self.resolved_paths(blueprint_id)?;

        for dependent_id in dependents {
            match self.rematerialize_dependent(&dependent_id, &source, &source_resolved) {
                Ok(()) => {
                    self.cache.invalidate(&dependent_id);
                    match self.schedule_schema_reindex(&dependent_id) {
                        Ok(true) => report.reindex_scheduled.push(dependent_id.clone()),
                        Ok(false) => {}
                        Err(e) => {
                            error!(
                                "Failed to schedule reindex for dependent {}: {}",
                                dependent_id, e
                            );
                            report.failures.push(CascadeFailure {
                                blueprint_id: dependent_id.clone(),
                                error: e.to_string(),
                            });
                        }
                    }
                    match self.propagate_structure_change(&dependent_id, visited) {
                        Ok(sub_report) => report.merge(sub_report),
                        Err(e) => {
                            error!(
                                "Cascade below dependent {} failed: {}; continuing with siblings",
                                dependent_id, e
                            );
                            report.failures.push(CascadeFailure {
                                blueprint_id: dependent_id.clone(),
                                error: e.to_string(),
                            });
                        }
                    }
                }
                Err(e) => {
                    error!(
                        "Re-materialization of dependent {} failed: {}; continuing with siblings",
                        dependent_id, e
                    );
                    report.failures.push(CascadeFailure {
                        blueprint_id: dependent_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Re-runs materialization on one dependent for every attachment and
    /// embedding sourced from the changed blueprint, then persists it.
    fn rematerialize_dependent(
        &self,
        dependent_id: &str,
        source: &Blueprint,
        source_resolved: &[Path],
    ) -> Result<(), SchemaError> {
        let snapshot = {
            let mut blueprints = self.lock_blueprints()?;
            let dependent = blueprints
                .get_mut(dependent_id)
                .ok_or_else(|| SchemaError::NotFound(dependent_id.to_string()))?;

            let attachments: Vec<ComponentAttachment> = dependent
                .attachments
                .iter()
                .filter(|a| a.component_id == source.id)
                .cloned()
                .collect();
            let embedding_ids = dependent.embedding_points_targeting(&source.id);

            let mut updated = dependent.clone();
            for attachment in &attachments {
                materialize_component(&mut updated, source, &attachment.path_prefix)?;
            }
            for embed_path_id in &embedding_ids {
                materialize_embedding(&mut updated, embed_path_id, source_resolved)?;
            }
            *dependent = updated;
            dependent.clone()
        };

        self.persist_blueprint(&snapshot)?;
        Ok(())
    }
}
