use std::path::PathBuf;

use erdsync::direction::{BindingCatalog, EmptyCatalog};
use erdsync::inference::InferenceConfig;
use erdsync::model::{Cardinality, Entity, EntityId, RelationshipOrigin};
use erdsync::schema::{ScannedTest, SchemaError, SchemaScanner};
use erdsync::workspace::Workspace;
use serde_json::json;

/// Scanner returning a fixed set of tests.
struct StaticScanner(Vec<ScannedTest>);

impl SchemaScanner for StaticScanner {
    fn scan(&self, _paths: &[PathBuf]) -> Result<Vec<ScannedTest>, SchemaError> {
        Ok(self.0.clone())
    }
}

/// Scanner that always fails.
struct FailingScanner;

impl SchemaScanner for FailingScanner {
    fn scan(&self, _paths: &[PathBuf]) -> Result<Vec<ScannedTest>, SchemaError> {
        Err(SchemaError::Scan("no project here".into()))
    }
}

fn bound_workspace() -> Workspace {
    let mut ws = Workspace::new();
    ws.add_entity(Entity::new("customers", "Customers").with_binding("customers"))
        .unwrap();
    ws.add_entity(Entity::new("orders", "Orders").with_binding("orders"))
        .unwrap();
    ws
}

fn customer_fk_scanner() -> StaticScanner {
    StaticScanner(vec![ScannedTest::new(
        "orders",
        "customer_id",
        json!({"to": "ref('customers')", "field": "id"}),
    )])
}

#[test]
fn test_pull_is_idempotent() {
    let mut ws = bound_workspace();
    let scanner = customer_fk_scanner();
    let config = InferenceConfig::default();

    ws.pull(&scanner, &[], &config).unwrap();
    let first = ws.relationships().to_vec();

    ws.pull(&scanner, &[], &config).unwrap();
    let second = ws.relationships().to_vec();

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
}

#[test]
fn test_pull_never_deletes_a_user_drawn_edge() {
    let mut ws = bound_workspace();
    ws.add_entity(Entity::new("notes", "Notes")).unwrap();
    ws.connect(
        &EntityId::new("notes"),
        &EntityId::new("customers"),
        None,
        &EmptyCatalog,
    )
    .unwrap();

    ws.pull(&customer_fk_scanner(), &[], &InferenceConfig::default())
        .unwrap();

    assert_eq!(ws.relationships().len(), 2);
    assert_eq!(ws.drawn_count(), 1);
}

#[test]
fn test_scan_failure_leaves_the_workspace_unchanged() {
    let mut ws = bound_workspace();
    ws.pull(&customer_fk_scanner(), &[], &InferenceConfig::default())
        .unwrap();
    let before = ws.relationships().to_vec();

    let err = ws
        .pull(&FailingScanner, &[], &InferenceConfig::default())
        .unwrap_err();
    assert!(err.to_string().contains("1 relationships"));
    assert_eq!(ws.relationships(), before.as_slice());
}

#[test]
fn test_rebinding_upgrades_the_generic_edge() {
    let mut ws = Workspace::new();
    ws.add_entity(Entity::new("customers", "Customers").with_binding("customers"))
        .unwrap();
    // Greenfield entity, not bound to anything yet.
    ws.add_entity(Entity::new("orders", "Orders")).unwrap();

    // The user sketches a connection with no field mapping.
    let drawn_id = ws
        .connect(
            &EntityId::new("orders"),
            &EntityId::new("customers"),
            None,
            &EmptyCatalog,
        )
        .unwrap();
    assert!(ws.relationship(&drawn_id).unwrap().is_generic());

    // Binding the entity and pulling resolves the reference.
    ws.bind_entity(&EntityId::new("orders"), "orders").unwrap();
    ws.pull(&customer_fk_scanner(), &[], &InferenceConfig::default())
        .unwrap();

    // One edge, not two, and it now carries the field mapping.
    assert_eq!(ws.relationships().len(), 1);
    let edge = ws.relationship(&drawn_id).unwrap();
    assert_eq!(edge.source, EntityId::new("customers"));
    assert_eq!(edge.source_field.as_deref(), Some("id"));
    assert_eq!(edge.target_field.as_deref(), Some("customer_id"));
    assert_eq!(edge.origin, RelationshipOrigin::UserDrawn);
}

#[test]
fn test_connect_normalizes_direction_with_catalog_metadata() {
    let mut ws = bound_workspace();
    let mut catalog = BindingCatalog::new();
    catalog.record_primary_key("customers", "id");
    catalog.record_foreign_key("orders", "customer_id");

    // Drawn child → parent; the normalizer flips it.
    let id = ws
        .connect(
            &EntityId::new("orders"),
            &EntityId::new("customers"),
            Some(("customer_id".into(), "id".into())),
            &catalog,
        )
        .unwrap();

    let edge = ws.relationship(&id).unwrap();
    assert_eq!(edge.source, EntityId::new("customers"));
    assert_eq!(edge.cardinality, Cardinality::OneToMany);
    let anchor = edge.test_anchor.as_ref().unwrap();
    assert_eq!(anchor.model, "orders");
    assert_eq!(anchor.column, "customer_id");
}

#[test]
fn test_connecting_an_inferred_pair_converges_on_the_existing_edge() {
    let mut ws = bound_workspace();
    ws.pull(&customer_fk_scanner(), &[], &InferenceConfig::default())
        .unwrap();
    let existing = ws.relationships()[0].id.clone();

    let id = ws
        .connect(
            &EntityId::new("customers"),
            &EntityId::new("orders"),
            Some(("id".into(), "customer_id".into())),
            &EmptyCatalog,
        )
        .unwrap();

    assert_eq!(id, existing);
    assert_eq!(ws.relationships().len(), 1);
}

#[test]
fn test_swap_relocates_the_test_anchor() {
    let mut ws = bound_workspace();
    ws.pull(&customer_fk_scanner(), &[], &InferenceConfig::default())
        .unwrap();
    let id = ws.relationships()[0].id.clone();

    ws.swap(&id).unwrap();

    let edge = ws.relationship(&id).unwrap();
    assert_eq!(edge.source, EntityId::new("orders"));
    assert_eq!(edge.cardinality, Cardinality::ManyToOne);

    // New anchor on the new child side, old anchor queued for removal.
    let anchor = edge.test_anchor.as_ref().unwrap();
    assert_eq!(anchor.model, "customers");
    assert_eq!(anchor.column, "id");
    assert_eq!(ws.pending_removals().len(), 1);
    assert_eq!(ws.pending_removals()[0].model, "orders");
    assert_eq!(ws.pending_removals()[0].column, "customer_id");

    // Swapping back restores the original anchor location.
    ws.swap(&id).unwrap();
    let edge = ws.relationship(&id).unwrap();
    assert_eq!(edge.source, EntityId::new("customers"));
    assert_eq!(edge.test_anchor.as_ref().unwrap().model, "orders");
}

#[test]
fn test_remove_node_drops_incident_edges() {
    let mut ws = bound_workspace();
    ws.pull(&customer_fk_scanner(), &[], &InferenceConfig::default())
        .unwrap();
    assert_eq!(ws.relationships().len(), 1);

    ws.remove_node(&EntityId::new("orders")).unwrap();
    assert!(ws.relationships().is_empty());
    assert!(ws.entity(&EntityId::new("orders")).is_none());
}

#[test]
fn test_layout_covers_every_edge_on_canvas() {
    let mut ws = Workspace::new();
    ws.add_entity(
        Entity::new("customers", "Customers")
            .with_binding("customers")
            .at(0.0, 0.0)
            .sized(100.0, 100.0),
    )
    .unwrap();
    ws.add_entity(
        Entity::new("orders", "Orders")
            .with_binding("orders")
            .at(200.0, 0.0)
            .sized(100.0, 100.0),
    )
    .unwrap();
    ws.pull(&customer_fk_scanner(), &[], &InferenceConfig::default())
        .unwrap();

    let layouts = ws.layout();
    assert_eq!(layouts.len(), 1);
    assert_eq!(layouts[0].path, "M 100 50 L 150 50 L 150 50 L 200 50");
}

#[test]
fn test_document_round_trip() {
    let mut ws = bound_workspace();
    ws.pull(&customer_fk_scanner(), &[], &InferenceConfig::default())
        .unwrap();

    let document = ws.to_document();
    let body = serde_json::to_string(&document).unwrap();
    let restored = Workspace::from_document(serde_json::from_str(&body).unwrap());

    assert_eq!(restored.nodes(), ws.nodes());
    assert_eq!(restored.relationships(), ws.relationships());
}
