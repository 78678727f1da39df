//! Payload projection into typed index rows.

mod common;

use blueprintdb::{
    BlueprintKind, Cardinality, DataType, Path, PathUpdate, TypedValue,
};
use common::CommonTestFixture;
use serde_json::json;

#[test]
fn many_cardinality_rows_preserve_array_order_and_roundtrip() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let article = schema.create_blueprint("article", BlueprintKind::Full).unwrap();
    let tags_id = fixture.add_path(
        &article.id,
        Path::new("tags", DataType::String)
            .with_cardinality(Cardinality::Many)
            .with_indexed(true),
    );

    let entry = fixture
        .db
        .create_entry(&article.id, json!({"tags": ["php", "laravel", "testing"]}))
        .unwrap();

    let (values, refs) = fixture.db.rows_for_entry(&entry.id).unwrap();
    assert!(refs.is_empty());
    assert_eq!(values.len(), 3);
    for (idx, expected) in ["php", "laravel", "testing"].iter().enumerate() {
        assert_eq!(values[idx].path_id, tags_id);
        assert_eq!(values[idx].idx, idx as u32);
        assert_eq!(values[idx].value, TypedValue::String(expected.to_string()));
    }

    // Re-running the sync on an unchanged record produces the same three
    // rows, not six.
    fixture.db.request_entry_reindex(&entry.id).unwrap();
    fixture.db.process_pending_reindexes().unwrap();
    let (values, _) = fixture.db.rows_for_entry(&entry.id).unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(values[0].value, TypedValue::String("php".to_string()));
    assert_eq!(values[2].value, TypedValue::String("testing".to_string()));
}

#[test]
fn toggling_is_indexed_on_backfills_rows_via_reindex() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let article = schema.create_blueprint("article", BlueprintKind::Full).unwrap();
    let title_id = fixture.add_path(&article.id, Path::new("title", DataType::String));

    let entry = fixture
        .db
        .create_entry(&article.id, json!({"title": "hello world"}))
        .unwrap();
    let (values, _) = fixture.db.rows_for_entry(&entry.id).unwrap();
    assert!(values.is_empty(), "unindexed paths never produce rows");

    schema
        .update_path(
            &article.id,
            &title_id,
            PathUpdate {
                is_indexed: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
    fixture.db.process_pending_reindexes().unwrap();

    let (values, _) = fixture.db.rows_for_entry(&entry.id).unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].value, TypedValue::String("hello world".to_string()));
}

#[test]
fn toggling_is_indexed_off_removes_existing_rows() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let article = schema.create_blueprint("article", BlueprintKind::Full).unwrap();
    let title_id = fixture.add_path(
        &article.id,
        Path::new("title", DataType::String).with_indexed(true),
    );

    let entry = fixture
        .db
        .create_entry(&article.id, json!({"title": "hello"}))
        .unwrap();
    assert_eq!(fixture.db.rows_for_entry(&entry.id).unwrap().0.len(), 1);

    schema
        .update_path(
            &article.id,
            &title_id,
            PathUpdate {
                is_indexed: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

    let (values, refs) = fixture.db.rows_for_entry(&entry.id).unwrap();
    assert!(values.is_empty());
    assert!(refs.is_empty());
}

#[test]
fn deleting_an_entry_leaves_no_orphan_rows() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let article = schema.create_blueprint("article", BlueprintKind::Full).unwrap();
    fixture.add_path(&article.id, Path::new("title", DataType::String).with_indexed(true));
    fixture.add_path(&article.id, Path::new("rating", DataType::Int).with_indexed(true));
    fixture.add_path(
        &article.id,
        Path::new("related", DataType::Ref)
            .with_cardinality(Cardinality::Many)
            .with_indexed(true),
    );

    let entry = fixture
        .db
        .create_entry(
            &article.id,
            json!({"title": "t", "rating": 5, "related": ["other-entry"]}),
        )
        .unwrap();
    let (values, refs) = fixture.db.rows_for_entry(&entry.id).unwrap();
    assert_eq!(values.len() + refs.len(), 3);

    fixture.db.delete_entry(&entry.id).unwrap();
    let (values, refs) = fixture.db.rows_for_entry(&entry.id).unwrap();
    assert!(values.is_empty());
    assert!(refs.is_empty());
    assert!(fixture.db.get_entry(&entry.id).unwrap().is_none());
}

#[test]
fn mismatched_values_skip_the_path_but_not_the_entry() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let article = schema.create_blueprint("article", BlueprintKind::Full).unwrap();
    let rating_id = fixture.add_path(
        &article.id,
        Path::new("rating", DataType::Int).with_indexed(true),
    );
    let title_id = fixture.add_path(
        &article.id,
        Path::new("title", DataType::String).with_indexed(true),
    );

    let entry = fixture
        .db
        .create_entry(&article.id, json!({"rating": "not a number", "title": "ok"}))
        .unwrap();

    let (values, _) = fixture.db.rows_for_entry(&entry.id).unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].path_id, title_id);
    assert!(values.iter().all(|row| row.path_id != rating_id));
}

#[test]
fn one_cardinality_rejects_arrays_and_many_rejects_scalars() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let article = schema.create_blueprint("article", BlueprintKind::Full).unwrap();
    fixture.add_path(
        &article.id,
        Path::new("single", DataType::String).with_indexed(true),
    );
    fixture.add_path(
        &article.id,
        Path::new("multi", DataType::String)
            .with_cardinality(Cardinality::Many)
            .with_indexed(true),
    );

    let entry = fixture
        .db
        .create_entry(
            &article.id,
            json!({"single": ["a", "b"], "multi": "scalar"}),
        )
        .unwrap();

    let (values, _) = fixture.db.rows_for_entry(&entry.id).unwrap();
    assert!(values.is_empty());
}

#[test]
fn missing_and_null_values_emit_no_rows() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let article = schema.create_blueprint("article", BlueprintKind::Full).unwrap();
    fixture.add_path(&article.id, Path::new("title", DataType::String).with_indexed(true));
    fixture.add_path(&article.id, Path::new("summary", DataType::Text).with_indexed(true));

    let entry = fixture
        .db
        .create_entry(&article.id, json!({"summary": null}))
        .unwrap();
    let (values, _) = fixture.db.rows_for_entry(&entry.id).unwrap();
    assert!(values.is_empty());
}

#[test]
fn typed_columns_follow_the_data_type() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let article = schema.create_blueprint("article", BlueprintKind::Full).unwrap();
    fixture.add_path(&article.id, Path::new("rating", DataType::Int).with_indexed(true));
    fixture.add_path(&article.id, Path::new("score", DataType::Float).with_indexed(true));
    fixture.add_path(&article.id, Path::new("live", DataType::Bool).with_indexed(true));
    fixture.add_path(&article.id, Path::new("published_on", DataType::Date).with_indexed(true));
    fixture.add_path(&article.id, Path::new("meta", DataType::Json).with_indexed(true));

    let entry = fixture
        .db
        .create_entry(
            &article.id,
            json!({
                "rating": 4,
                "score": 7.5,
                "live": true,
                "published_on": "2024-05-01",
                "meta": {"views": 10}
            }),
        )
        .unwrap();

    let (values, _) = fixture.db.rows_for_entry(&entry.id).unwrap();
    assert_eq!(values.len(), 5);
    assert!(values.iter().any(|r| matches!(r.value, TypedValue::Int(4))));
    assert!(values.iter().any(|r| matches!(r.value, TypedValue::Float(f) if f == 7.5)));
    assert!(values.iter().any(|r| matches!(r.value, TypedValue::Bool(true))));
    assert!(values.iter().any(|r| matches!(r.value, TypedValue::Date(_))));
    assert!(values.iter().any(|r| matches!(r.value, TypedValue::Json(_))));
}

#[test]
fn embedded_copies_keep_their_source_cardinality() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let person = fixture.create_person_blueprint();
    let article = schema.create_blueprint("article", BlueprintKind::Full).unwrap();
    let authors_id = fixture.add_path(
        &article.id,
        Path::new("authors", DataType::Blueprint).with_cardinality(Cardinality::Many),
    );
    schema
        .set_embedding_target(&article.id, &authors_id, Some(&person.id))
        .unwrap();

    // The materialized copy `authors.name` keeps the source's One
    // cardinality, so a multi-element list is a cardinality mismatch and is
    // skipped; a single-element list resolves to one value and indexes.
    let entry = fixture
        .db
        .create_entry(&article.id, json!({"authors": [{"name": "ana"}]}))
        .unwrap();
    let (values, _) = fixture.db.rows_for_entry(&entry.id).unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].value, TypedValue::String("ana".to_string()));

    let entry = fixture
        .db
        .create_entry(
            &article.id,
            json!({"authors": [{"name": "ana"}, {"name": "ben"}]}),
        )
        .unwrap();
    let (values, _) = fixture.db.rows_for_entry(&entry.id).unwrap();
    assert!(values.is_empty());
}
