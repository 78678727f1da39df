//! Structure-change propagation across the dependent graph.
//!
//! When a blueprint changes shape, every blueprint that attaches or embeds
//! it must re-materialize its copies, and so on transitively. The walk
//! carries an explicit visited set so diamonds and cycles terminate with
//! each blueprint processed at most once per triggering change.

mod coordinator;
mod dependents;

use serde::{Deserialize, Serialize};

/// One dependent the cascade could not re-materialize. The cascade
/// continues with siblings; failures surface here and in the logs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CascadeFailure {
    pub blueprint_id: String,
    pub error: String,
}

/// Outcome of one structure-change cascade.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CascadeReport {
    /// Blueprints processed, origin first, each at most once.
    pub visited: Vec<String>,
    /// Blueprints for which a background reindex task was enqueued.
    pub reindex_scheduled: Vec<String>,
    /// Dependents skipped because their re-materialization failed.
    pub failures: Vec<CascadeFailure>,
}

impl CascadeReport {
    pub fn merge(&mut self, other: CascadeReport) {
        self.visited.extend(other.visited);
        for id in other.reindex_scheduled {
            if !self.reindex_scheduled.contains(&id) {
                self.reindex_scheduled.push(id);
            }
        }
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
