//! Common test utilities and fixtures for integration tests.

use blueprintdb::{
    Blueprint, BlueprintDb, BlueprintDbError, BlueprintKind, Cardinality, DataType, Path,
};
use tempfile::TempDir;

/// Test fixture wiring a full engine over a temporary database.
pub struct CommonTestFixture {
    pub db: BlueprintDb,
    pub _temp_dir: TempDir,
}

impl CommonTestFixture {
    pub fn new() -> Result<Self, BlueprintDbError> {
        let temp_dir = tempfile::tempdir()
            .map_err(|e| BlueprintDbError::Other(format!("Failed to create temp directory: {}", e)))?;

        let sled_db = sled::Config::new()
            .path(temp_dir.path())
            .temporary(true)
            .open()?;
        let db = BlueprintDb::with_db(sled_db)?;

        Ok(Self {
            db,
            _temp_dir: temp_dir,
        })
    }

    /// Adds a path and returns its id (the cascade report is discarded).
    pub fn add_path(&self, blueprint_id: &str, path: Path) -> String {
        let path_id = path.id.clone();
        self.db.schema().add_path(blueprint_id, path).unwrap();
        path_id
    }

    /// A `seo` component with an indexed `meta_title` (string, one) and an
    /// indexed `keywords` (string, many).
    pub fn create_seo_component(&self) -> Blueprint {
        let seo = self
            .db
            .schema()
            .create_blueprint("seo", BlueprintKind::Component)
            .unwrap();
        self.add_path(
            &seo.id,
            Path::new("meta_title", DataType::String).with_indexed(true),
        );
        self.add_path(
            &seo.id,
            Path::new("keywords", DataType::String)
                .with_cardinality(Cardinality::Many)
                .with_indexed(true),
        );
        self.db.schema().get_blueprint(&seo.id).unwrap()
    }

    /// A `person` full blueprint with indexed `name` and unindexed `email`.
    pub fn create_person_blueprint(&self) -> Blueprint {
        let person = self
            .db
            .schema()
            .create_blueprint("person", BlueprintKind::Full)
            .unwrap();
        self.add_path(
            &person.id,
            Path::new("name", DataType::String).with_indexed(true),
        );
        self.add_path(&person.id, Path::new("email", DataType::String));
        self.db.schema().get_blueprint(&person.id).unwrap()
    }
}
