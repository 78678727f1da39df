//! Cascade termination and failure reporting over dependent graphs.

mod common;

use std::collections::HashSet;

use blueprintdb::{BlueprintKind, DataType, Path};
use common::CommonTestFixture;

/// A embeds B and C; B and C both embed D. Changing D must visit every
/// blueprint exactly once and still refresh A's copies from both arms.
#[test]
fn diamond_graph_visits_each_blueprint_once() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let d = schema.create_blueprint("d", BlueprintKind::Full).unwrap();
    fixture.add_path(&d.id, Path::new("label", DataType::String).with_indexed(true));

    let b = schema.create_blueprint("b", BlueprintKind::Full).unwrap();
    let b_embed = fixture.add_path(&b.id, Path::new("inner", DataType::Blueprint));
    schema.set_embedding_target(&b.id, &b_embed, Some(&d.id)).unwrap();

    let c = schema.create_blueprint("c", BlueprintKind::Full).unwrap();
    let c_embed = fixture.add_path(&c.id, Path::new("inner", DataType::Blueprint));
    schema.set_embedding_target(&c.id, &c_embed, Some(&d.id)).unwrap();

    let a = schema.create_blueprint("a", BlueprintKind::Full).unwrap();
    let a_left = fixture.add_path(&a.id, Path::new("left", DataType::Blueprint));
    schema.set_embedding_target(&a.id, &a_left, Some(&b.id)).unwrap();
    let a_right = fixture.add_path(&a.id, Path::new("right", DataType::Blueprint));
    schema.set_embedding_target(&a.id, &a_right, Some(&c.id)).unwrap();

    let report = schema
        .add_path(&d.id, Path::new("extra", DataType::String).with_indexed(true))
        .unwrap();

    assert!(report.is_clean());
    let visited: HashSet<&str> = report.visited.iter().map(String::as_str).collect();
    assert_eq!(visited.len(), report.visited.len(), "no blueprint visited twice");
    assert_eq!(
        visited,
        HashSet::from([d.id.as_str(), b.id.as_str(), c.id.as_str(), a.id.as_str()])
    );

    // Both arms of the diamond delivered the new field to A.
    let resolved = schema.resolved_paths(&a.id).unwrap();
    assert!(resolved.iter().any(|p| p.full_path == "left.inner.extra"));
    assert!(resolved.iter().any(|p| p.full_path == "right.inner.extra"));
}

/// A cycle that slipped past validation (loaded from an external source)
/// must terminate with each blueprint visited at most once.
#[test]
fn forced_cycle_terminates() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let a = schema.create_blueprint("a", BlueprintKind::Full).unwrap();
    fixture.add_path(&a.id, Path::new("x", DataType::String));
    let b = schema.create_blueprint("b", BlueprintKind::Full).unwrap();
    let b_embed = fixture.add_path(&b.id, Path::new("a_side", DataType::Blueprint));
    schema.set_embedding_target(&b.id, &b_embed, Some(&a.id)).unwrap();

    // Force a -> b by loading a crafted definition, bypassing cycle
    // validation the way a trusted external source could.
    let mut forced = schema.get_blueprint(&a.id).unwrap();
    let mut back_edge = Path::new("b_side", DataType::Blueprint);
    back_edge.embedded_blueprint_id = Some(b.id.clone());
    forced.paths.insert(back_edge.id.clone(), back_edge);
    schema.load_blueprint(forced).unwrap();

    let report = schema
        .add_path(&a.id, Path::new("y", DataType::String))
        .unwrap();

    let visited: HashSet<&str> = report.visited.iter().map(String::as_str).collect();
    assert_eq!(visited.len(), report.visited.len(), "no blueprint visited twice");
    assert!(visited.contains(a.id.as_str()));
    assert!(visited.contains(b.id.as_str()));
}

/// A failing dependent is reported and skipped; its siblings still
/// re-materialize.
#[test]
fn failing_dependent_is_reported_and_siblings_continue() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let source = schema.create_blueprint("source", BlueprintKind::Full).unwrap();
    fixture.add_path(&source.id, Path::new("label", DataType::String));

    let healthy = schema.create_blueprint("healthy", BlueprintKind::Full).unwrap();
    let healthy_embed = fixture.add_path(&healthy.id, Path::new("embed", DataType::Blueprint));
    schema
        .set_embedding_target(&healthy.id, &healthy_embed, Some(&source.id))
        .unwrap();

    let broken = schema.create_blueprint("broken", BlueprintKind::Full).unwrap();
    let broken_embed = fixture.add_path(&broken.id, Path::new("embed", DataType::Blueprint));
    schema
        .set_embedding_target(&broken.id, &broken_embed, Some(&source.id))
        .unwrap();

    // Plant a colliding authored path on `broken` so the next
    // re-materialization of `embed.extra` must fail.
    let mut crafted = schema.get_blueprint(&broken.id).unwrap();
    let collision = Path::new("collision", DataType::String);
    let collision_id = collision.id.clone();
    crafted.paths.insert(collision_id.clone(), collision);
    crafted.path_mut(&collision_id).unwrap().full_path = "embed.extra".to_string();
    schema.load_blueprint(crafted).unwrap();

    let report = schema
        .add_path(&source.id, Path::new("extra", DataType::String))
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].blueprint_id, broken.id);
    assert!(report.failures[0].error.contains("Duplicate path"));

    // The healthy sibling still got the new field.
    let resolved = schema.resolved_paths(&healthy.id).unwrap();
    assert!(resolved.iter().any(|p| p.full_path == "embed.extra"));
}

/// Re-running the propagation with an already-visited origin is a no-op,
/// which is what bounds the walk.
#[test]
fn visited_origin_short_circuits() {
    let fixture = CommonTestFixture::new().unwrap();
    let schema = fixture.db.schema();

    let a = schema.create_blueprint("a", BlueprintKind::Full).unwrap();
    fixture.add_path(&a.id, Path::new("x", DataType::String));

    let mut visited = HashSet::new();
    visited.insert(a.id.clone());
    let report = schema.propagate_structure_change(&a.id, &mut visited).unwrap();
    assert!(report.visited.is_empty());
    assert!(report.is_clean());
}
