use erdsync::inference::{EntityIndex, InferenceConfig, InferenceEngine};
use erdsync::model::{Cardinality, Entity, EntityId, Node};
use erdsync::schema::ScannedTest;
use serde_json::json;

fn canvas() -> Vec<Node> {
    vec![
        Node::Entity(Entity::new("customers", "Customers").with_binding("customers")),
        Node::Entity(Entity::new("orders", "Orders").with_binding("orders")),
        Node::Entity(Entity::new("payments", "Payments").with_binding("payments")),
    ]
}

fn relationship_test(model: &str, column: &str, config: serde_json::Value) -> ScannedTest {
    ScannedTest::new(model, column, config)
}

#[test]
fn test_emission_direction_is_parent_to_child() {
    let engine = InferenceEngine::default();
    let index = EntityIndex::from_nodes(&canvas());
    let tests = vec![relationship_test(
        "orders",
        "customer_id",
        json!({"to": "ref('customers')", "field": "id"}),
    )];

    let outcome = engine.infer(&tests, &index, 3);
    assert_eq!(outcome.relationships.len(), 1);

    let rel = &outcome.relationships[0];
    assert_eq!(rel.source, EntityId::new("customers"));
    assert_eq!(rel.target, EntityId::new("orders"));
    assert_eq!(rel.source_field.as_deref(), Some("id"));
    assert_eq!(rel.target_field.as_deref(), Some("customer_id"));
    assert_eq!(rel.cardinality, Cardinality::OneToMany);

    let anchor = rel.test_anchor.as_ref().unwrap();
    assert_eq!(anchor.model, "orders");
    assert_eq!(anchor.column, "customer_id");
}

#[test]
fn test_both_test_forms_infer_the_identical_relationship() {
    let engine = InferenceEngine::default();
    let index = EntityIndex::from_nodes(&canvas());

    let top = vec![relationship_test(
        "orders",
        "customer_id",
        json!({"to": "ref('customers')", "field": "id"}),
    )];
    let nested = vec![relationship_test(
        "orders",
        "customer_id",
        json!({"arguments": {"to": "ref('customers')", "field": "id"}}),
    )];

    let a = engine.infer(&top, &index, 3).relationships;
    let b = engine.infer(&nested, &index, 3).relationships;
    assert_eq!(a, b);
}

#[test]
fn test_malformed_test_does_not_block_valid_ones() {
    let engine = InferenceEngine::default();
    let index = EntityIndex::from_nodes(&canvas());
    let tests = vec![
        relationship_test("orders", "customer_id", json!({"to": "ref('customers')"})),
        relationship_test(
            "payments",
            "order_id",
            json!({"to": "ref('orders')", "field": "id"}),
        ),
    ];

    let outcome = engine.infer(&tests, &index, 3);
    assert_eq!(outcome.skipped_malformed, 1);
    assert_eq!(outcome.relationships.len(), 1);
    assert_eq!(outcome.relationships[0].target, EntityId::new("payments"));
}

#[test]
fn test_unresolved_endpoint_drops_only_that_candidate() {
    let engine = InferenceEngine::default();
    let index = EntityIndex::from_nodes(&canvas());
    let tests = vec![
        relationship_test(
            "orders",
            "warehouse_id",
            json!({"to": "ref('warehouses')", "field": "id"}),
        ),
        relationship_test(
            "orders",
            "customer_id",
            json!({"to": "ref('customers')", "field": "id"}),
        ),
    ];

    let outcome = engine.infer(&tests, &index, 3);
    assert_eq!(outcome.skipped_unresolved, 1);
    assert_eq!(outcome.relationships.len(), 1);
    assert_eq!(outcome.relationships[0].source, EntityId::new("customers"));
}

#[test]
fn test_versioned_reference_resolves_to_base_binding() {
    let engine = InferenceEngine::default();
    let index = EntityIndex::from_nodes(&canvas());
    let tests = vec![relationship_test(
        "orders",
        "customer_id",
        json!({"to": "ref('customers.v2')", "field": "id"}),
    )];

    let outcome = engine.infer(&tests, &index, 3);
    assert_eq!(outcome.relationships.len(), 1);
    assert_eq!(outcome.relationships[0].source, EntityId::new("customers"));
}

#[test]
fn test_secondary_binding_counts_as_resolution() {
    let mut nodes = canvas();
    nodes.push(Node::Entity(
        Entity::new("inventory", "Inventory")
            .with_binding("inventory")
            .with_binding("inventory_snapshot"),
    ));
    let engine = InferenceEngine::default();
    let index = EntityIndex::from_nodes(&nodes);
    let tests = vec![relationship_test(
        "orders",
        "sku",
        json!({"to": "ref('inventory_snapshot')", "field": "sku"}),
    )];

    let outcome = engine.infer(&tests, &index, 4);
    assert_eq!(outcome.relationships.len(), 1);
    assert_eq!(outcome.relationships[0].source, EntityId::new("inventory"));
}

#[test]
fn test_cardinality_hint_overrides_default() {
    let engine = InferenceEngine::default();
    let index = EntityIndex::from_nodes(&canvas());
    let tests = vec![relationship_test(
        "orders",
        "customer_id",
        json!({"to": "ref('customers')", "field": "id", "cardinality": "one_to_one"}),
    )];

    let outcome = engine.infer(&tests, &index, 3);
    assert_eq!(outcome.relationships[0].cardinality, Cardinality::OneToOne);
}

#[test]
fn test_missing_entity_creation_is_opt_in() {
    let engine = InferenceEngine::new(InferenceConfig::default().with_missing_entities(true));
    let index = EntityIndex::from_nodes(&canvas());
    let tests = vec![relationship_test(
        "orders",
        "warehouse_id",
        json!({"to": "ref('warehouses')", "field": "id"}),
    )];

    let outcome = engine.infer(&tests, &index, 3);
    assert_eq!(outcome.skipped_unresolved, 0);
    assert_eq!(outcome.new_entities.len(), 1);
    assert_eq!(outcome.new_entities[0].name, "warehouses");
    assert_eq!(outcome.relationships.len(), 1);
}
