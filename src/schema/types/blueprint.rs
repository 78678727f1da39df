use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::path::Path;

/// Whether a blueprint can back content entries directly or only exists to
/// be attached to other blueprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlueprintKind {
    Full,
    Component,
}

/// A component attached to a host blueprint. The prefix is prepended to
/// every materialized copy's `full_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentAttachment {
    pub component_id: String,
    pub path_prefix: String,
}

/// A content schema: an arena of paths keyed by path id plus the component
/// attachments whose fields are materialized into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: String,
    pub name: String,
    pub kind: BlueprintKind,
    pub paths: HashMap<String, Path>,
    pub attachments: Vec<ComponentAttachment>,
}

impl Blueprint {
    #[must_use]
    pub fn new(name: &str, kind: BlueprintKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            kind,
            paths: HashMap::new(),
            attachments: Vec::new(),
        }
    }

    pub fn path(&self, path_id: &str) -> Option<&Path> {
        self.paths.get(path_id)
    }

    pub fn path_mut(&mut self, path_id: &str) -> Option<&mut Path> {
        self.paths.get_mut(path_id)
    }

    /// Paths that have not been tombstoned.
    pub fn live_paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.values().filter(|p| p.is_live())
    }

    /// Authored (non-materialized) live paths.
    pub fn authored_paths(&self) -> impl Iterator<Item = &Path> {
        self.live_paths().filter(|p| p.is_authored())
    }

    pub fn live_path_by_full_path(&self, full_path: &str) -> Option<&Path> {
        self.live_paths().find(|p| p.full_path == full_path)
    }

    /// Checks `full_path` uniqueness among live paths, ignoring `exclude_id`
    /// so a path can keep its own position on update.
    pub fn has_live_full_path(&self, full_path: &str, exclude_id: Option<&str>) -> bool {
        self.live_paths()
            .any(|p| p.full_path == full_path && Some(p.id.as_str()) != exclude_id)
    }

    pub fn attachment(&self, component_id: &str) -> Option<&ComponentAttachment> {
        self.attachments
            .iter()
            .find(|a| a.component_id == component_id)
    }

    /// Ids of live embedding points targeting the given blueprint.
    pub fn embedding_points_targeting(&self, blueprint_id: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .live_paths()
            .filter(|p| {
                p.is_embedding_point()
                    && p.embedded_blueprint_id.as_deref() == Some(blueprint_id)
            })
            .map(|p| p.id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Direct children of a path in the authored tree.
    pub fn children_of(&self, parent_id: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .paths
            .values()
            .filter(|p| p.parent_id.as_deref() == Some(parent_id))
            .map(|p| p.id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Whether this blueprint depends on another directly, either through an
    /// attachment or a live embedding point.
    pub fn depends_on(&self, blueprint_id: &str) -> bool {
        self.attachments.iter().any(|a| a.component_id == blueprint_id)
            || !self.embedding_points_targeting(blueprint_id).is_empty()
    }

    /// Ids of every blueprint this one depends on directly.
    pub fn dependency_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .attachments
            .iter()
            .map(|a| a.component_id.clone())
            .chain(
                self.live_paths()
                    .filter(|p| p.is_embedding_point())
                    .filter_map(|p| p.embedded_blueprint_id.clone()),
            )
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}
