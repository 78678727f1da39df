use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::schema::types::Path;

/// Memoizes the fully resolved (authored + materialized) live path list per
/// blueprint.
///
/// Invalidation must be exhaustive: every mutation that changes a
/// blueprint's field set drops its entry before returning, and the cascade
/// drops every dependent it visits. A stale read here is a correctness bug,
/// not a performance tradeoff.
pub struct ResolvedPathCache {
    entries: Mutex<HashMap<String, Arc<Vec<Path>>>>,
}

impl ResolvedPathCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, blueprint_id: &str) -> Option<Arc<Vec<Path>>> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.get(blueprint_id).cloned()
    }

    pub fn store(&self, blueprint_id: &str, paths: Arc<Vec<Path>>) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(blueprint_id.to_string(), paths);
    }

    pub fn invalidate(&self, blueprint_id: &str) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.remove(blueprint_id);
    }

    pub fn clear(&self) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.clear();
    }
}

impl Default for ResolvedPathCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{DataType, Path};

    #[test]
    fn store_get_invalidate_roundtrip() {
        let cache = ResolvedPathCache::new();
        assert!(cache.get("bp-1").is_none());

        let paths = Arc::new(vec![Path::new("title", DataType::String)]);
        cache.store("bp-1", Arc::clone(&paths));
        assert_eq!(cache.get("bp-1").unwrap().len(), 1);

        cache.invalidate("bp-1");
        assert!(cache.get("bp-1").is_none());
    }
}
