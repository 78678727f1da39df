use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A content record: one semi-structured payload bound to one blueprint.
///
/// Entries are the input and the trigger of the indexing engine. Their
/// lifecycle (create, update with changed keys, delete) is driven through
/// [`crate::BlueprintDb`], which projects the payload into typed index rows
/// on every save and removes the rows together with the entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub blueprint_id: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    #[must_use]
    pub fn new(blueprint_id: &str, payload: Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            blueprint_id: blueprint_id.to_string(),
            payload,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the payload and bumps the update timestamp.
    pub fn set_payload(&mut self, payload: Value) {
        self.payload = payload;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_payload_bumps_updated_at() {
        let mut entry = Entry::new("bp-1", json!({"title": "first"}));
        let created = entry.updated_at;
        entry.set_payload(json!({"title": "second"}));
        assert_eq!(entry.payload["title"], "second");
        assert!(entry.updated_at >= created);
        assert_eq!(entry.created_at, created);
    }
}
