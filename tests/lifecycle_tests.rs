//! Entry lifecycle, query reads and end-to-end cascade reindexing.

mod common;

use std::time::{Duration, Instant};

use blueprintdb::{BlueprintKind, Cardinality, DataType, FilterOp, Path, SchemaError};
use common::CommonTestFixture;
use serde_json::json;

#[test]
fn component_blueprints_cannot_have_entries() {
    let fixture = CommonTestFixture::new().unwrap();
    let seo = fixture.create_seo_component();

    let err = fixture.db.create_entry(&seo.id, json!({})).unwrap_err();
    assert!(err.to_string().contains("component"));
}

#[test]
fn update_entry_reprojects_only_on_indexed_changes() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let article = schema.create_blueprint("article", BlueprintKind::Full).unwrap();
    fixture.add_path(&article.id, Path::new("title", DataType::String).with_indexed(true));
    fixture.add_path(&article.id, Path::new("draft_notes", DataType::Text));

    let entry = fixture
        .db
        .create_entry(&article.id, json!({"title": "first", "draft_notes": "a"}))
        .unwrap();

    // A change under an unindexed path keeps the rows as they are.
    fixture
        .db
        .update_entry(&entry.id, json!({"title": "first", "draft_notes": "b"}))
        .unwrap();
    let (values, _) = fixture.db.rows_for_entry(&entry.id).unwrap();
    assert_eq!(values.len(), 1);

    // A change under an indexed path replaces them.
    fixture
        .db
        .update_entry(&entry.id, json!({"title": "second", "draft_notes": "b"}))
        .unwrap();
    let ids = fixture
        .db
        .find_entry_ids(&article.id, "title", FilterOp::Eq, &json!("second"))
        .unwrap();
    assert_eq!(ids, vec![entry.id.clone()]);
}

#[test]
fn query_layer_filters_by_equality_and_range() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let article = schema.create_blueprint("article", BlueprintKind::Full).unwrap();
    fixture.add_path(&article.id, Path::new("title", DataType::String).with_indexed(true));
    fixture.add_path(&article.id, Path::new("rating", DataType::Int).with_indexed(true));
    fixture.add_path(&article.id, Path::new("body", DataType::Text));

    let low = fixture
        .db
        .create_entry(&article.id, json!({"title": "low", "rating": 2}))
        .unwrap();
    let high = fixture
        .db
        .create_entry(&article.id, json!({"title": "high", "rating": 9}))
        .unwrap();

    let ids = fixture
        .db
        .find_entry_ids(&article.id, "title", FilterOp::Eq, &json!("low"))
        .unwrap();
    assert_eq!(ids, vec![low.id.clone()]);

    let ids = fixture
        .db
        .find_entry_ids(&article.id, "rating", FilterOp::Gt, &json!(5))
        .unwrap();
    assert_eq!(ids, vec![high.id.clone()]);

    let ids = fixture
        .db
        .find_entry_ids(&article.id, "rating", FilterOp::Lte, &json!(9))
        .unwrap();
    assert_eq!(ids.len(), 2);

    // Unindexed paths are not queryable.
    let err = fixture
        .db
        .find_entry_ids(&article.id, "body", FilterOp::Eq, &json!("x"))
        .unwrap_err();
    assert!(matches!(
        err,
        blueprintdb::BlueprintDbError::Schema(SchemaError::InvalidField(_))
    ));
}

#[test]
fn ref_paths_resolve_through_the_reference_table() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let person = fixture.create_person_blueprint();
    let article = schema.create_blueprint("article", BlueprintKind::Full).unwrap();
    fixture.add_path(
        &article.id,
        Path::new("authors", DataType::Ref)
            .with_cardinality(Cardinality::Many)
            .with_indexed(true),
    );

    let ana = fixture
        .db
        .create_entry(&person.id, json!({"name": "ana"}))
        .unwrap();
    let ben = fixture
        .db
        .create_entry(&person.id, json!({"name": "ben"}))
        .unwrap();

    let tagged = fixture
        .db
        .create_entry(&article.id, json!({"authors": [ana.id, ben.id]}))
        .unwrap();
    fixture
        .db
        .create_entry(&article.id, json!({"authors": []}))
        .unwrap();

    let ids = fixture
        .db
        .find_entry_ids(&article.id, "authors", FilterOp::Eq, &json!(ana.id.clone()))
        .unwrap();
    assert_eq!(ids, vec![tagged.id.clone()]);

    // Ranges over references are rejected.
    let err = fixture
        .db
        .find_entry_ids(&article.id, "authors", FilterOp::Gt, &json!(ana.id.clone()))
        .unwrap_err();
    assert!(matches!(
        err,
        blueprintdb::BlueprintDbError::Schema(SchemaError::InvalidData(_))
    ));
}

#[test]
fn component_rename_cascades_into_entry_rows() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let article = schema.create_blueprint("article", BlueprintKind::Full).unwrap();
    let seo = fixture.create_seo_component();
    schema.attach_component(&article.id, &seo.id, "seo").unwrap();

    let entry = fixture
        .db
        .create_entry(
            &article.id,
            json!({"seo": {"meta_title": "old", "headline": "new"}}),
        )
        .unwrap();
    let ids = fixture
        .db
        .find_entry_ids(&article.id, "seo.meta_title", FilterOp::Eq, &json!("old"))
        .unwrap();
    assert_eq!(ids, vec![entry.id.clone()]);

    // Rename the component field; the copy moves, a reindex task is
    // scheduled for the host, and after draining it the rows follow the
    // payload under the new full path.
    let meta_title_id = seo
        .paths
        .values()
        .find(|p| p.name == "meta_title")
        .unwrap()
        .id
        .clone();
    let report = schema.rename_path(&seo.id, &meta_title_id, "headline").unwrap();
    assert!(report.reindex_scheduled.contains(&article.id));

    fixture.db.process_pending_reindexes().unwrap();

    let ids = fixture
        .db
        .find_entry_ids(&article.id, "seo.headline", FilterOp::Eq, &json!("new"))
        .unwrap();
    assert_eq!(ids, vec![entry.id.clone()]);
}

#[test]
fn detach_then_reindex_drops_rows_for_removed_paths() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let article = schema.create_blueprint("article", BlueprintKind::Full).unwrap();
    fixture.add_path(&article.id, Path::new("title", DataType::String).with_indexed(true));
    let seo = fixture.create_seo_component();
    schema.attach_component(&article.id, &seo.id, "seo").unwrap();

    let entry = fixture
        .db
        .create_entry(
            &article.id,
            json!({"title": "t", "seo": {"meta_title": "m", "keywords": ["k1", "k2"]}}),
        )
        .unwrap();
    let (values, _) = fixture.db.rows_for_entry(&entry.id).unwrap();
    assert_eq!(values.len(), 4);

    schema.detach_component(&article.id, &seo.id).unwrap();
    fixture.db.process_pending_reindexes().unwrap();

    let (values, _) = fixture.db.rows_for_entry(&entry.id).unwrap();
    assert_eq!(values.len(), 1, "only the authored title row remains");

    // The removed paths are gone from the resolved list, so they are no
    // longer queryable either.
    assert!(fixture
        .db
        .find_entry_ids(&article.id, "seo.meta_title", FilterOp::Eq, &json!("m"))
        .is_err());
}

#[test]
fn compaction_physically_removes_tombstoned_paths() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let article = schema.create_blueprint("article", BlueprintKind::Full).unwrap();
    let seo = fixture.create_seo_component();
    schema.attach_component(&article.id, &seo.id, "seo").unwrap();
    schema.detach_component(&article.id, &seo.id).unwrap();

    let raw = schema.get_blueprint(&article.id).unwrap();
    assert!(raw.paths.values().any(|p| p.tombstoned));

    let compacted = schema.compact_blueprint(&article.id).unwrap();
    assert_eq!(compacted, 2);
    let raw = schema.get_blueprint(&article.id).unwrap();
    assert!(raw.paths.values().all(|p| !p.tombstoned));
}

#[test]
fn background_worker_drains_scheduled_reindexes() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let article = schema.create_blueprint("article", BlueprintKind::Full).unwrap();
    let title_id = fixture.add_path(&article.id, Path::new("title", DataType::String));
    let entry = fixture
        .db
        .create_entry(&article.id, json!({"title": "hello"}))
        .unwrap();

    fixture.db.start_reindex_worker().unwrap();
    schema
        .update_path(
            &article.id,
            &title_id,
            blueprintdb::PathUpdate {
                is_indexed: Some(true),
                ..Default::default()
            },
        )
        .unwrap();

    // Poll until the worker has projected the rows.
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let (values, _) = fixture.db.rows_for_entry(&entry.id).unwrap();
        if !values.is_empty() {
            break;
        }
        assert!(Instant::now() < deadline, "worker did not reindex in time");
        std::thread::sleep(Duration::from_millis(20));
    }
    fixture.db.stop_reindex_worker().unwrap();
}

#[test]
fn blueprints_with_dependents_or_entries_cannot_be_deleted() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let article = schema.create_blueprint("article", BlueprintKind::Full).unwrap();
    fixture.add_path(&article.id, Path::new("title", DataType::String));
    let seo = fixture.create_seo_component();
    schema.attach_component(&article.id, &seo.id, "seo").unwrap();

    // seo has a dependent.
    assert!(schema.delete_blueprint(&seo.id).is_err());

    // article has an entry.
    fixture.db.create_entry(&article.id, json!({})).unwrap();
    assert!(schema.delete_blueprint(&article.id).is_err());

    // After removing both obstacles, deletion goes through.
    schema.detach_component(&article.id, &seo.id).unwrap();
    schema.delete_blueprint(&seo.id).unwrap();
}
