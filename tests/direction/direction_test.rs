use erdsync::direction::{
    edge_label, normalize_drawn, swap_direction, BindingCatalog, EmptyCatalog,
};
use erdsync::model::{Cardinality, Relationship, TestAnchor};

fn drawn(source: &str, target: &str, sf: &str, tf: &str) -> Relationship {
    Relationship::new("edge", source, target, Cardinality::OneToMany)
        .with_fields(sf, tf)
        .drawn()
}

fn catalog() -> BindingCatalog {
    let mut catalog = BindingCatalog::new();
    catalog.record_primary_key("departments", "id");
    catalog.record_foreign_key("employees", "department_id");
    catalog
}

#[test]
fn test_fk_to_pk_draw_flips_to_parent_first() {
    let edge = drawn("employees", "departments", "department_id", "id");
    let normalized = normalize_drawn(edge, Some("employees"), Some("departments"), &catalog());

    assert_eq!(normalized.source.as_str(), "departments");
    assert_eq!(normalized.target.as_str(), "employees");
    assert_eq!(normalized.source_field.as_deref(), Some("id"));
    assert_eq!(normalized.target_field.as_deref(), Some("department_id"));
    assert_eq!(normalized.cardinality, Cardinality::OneToMany);
}

#[test]
fn test_pk_to_fk_draw_is_already_normalized() {
    let edge = drawn("departments", "employees", "id", "department_id");
    let normalized = normalize_drawn(edge, Some("departments"), Some("employees"), &catalog());
    assert_eq!(normalized.source.as_str(), "departments");
    assert_eq!(normalized.cardinality, Cardinality::OneToMany);
}

#[test]
fn test_ambiguous_metadata_keeps_literal_draw_direction() {
    // Both classified the same way: no flip.
    let mut both_pk = BindingCatalog::new();
    both_pk.record_primary_key("a", "id");
    both_pk.record_primary_key("b", "id");
    let edge = drawn("a", "b", "id", "id");
    let normalized = normalize_drawn(edge, Some("a"), Some("b"), &both_pk);
    assert_eq!(normalized.source.as_str(), "a");

    // No metadata at all: no flip, cardinality defaulted.
    let edge = drawn("employees", "departments", "department_id", "id");
    let normalized = normalize_drawn(edge, Some("employees"), Some("departments"), &EmptyCatalog);
    assert_eq!(normalized.source.as_str(), "employees");
    assert_eq!(normalized.cardinality, Cardinality::OneToMany);
}

#[test]
fn test_greenfield_entity_keeps_draw_direction() {
    let edge = drawn("sketch", "departments", "x", "id");
    let normalized = normalize_drawn(edge, None, Some("departments"), &catalog());
    assert_eq!(normalized.source.as_str(), "sketch");
}

#[test]
fn test_swap_twice_returns_the_original_edge() {
    let mut edge = drawn("departments", "employees", "id", "department_id");
    edge.test_anchor = Some(TestAnchor::new("employees", "department_id"));
    edge.label = Some("employs".into());

    assert_eq!(swap_direction(&swap_direction(&edge)), edge);
}

#[test]
fn test_swap_exchanges_roles_and_toggles_cardinality() {
    let edge = drawn("departments", "employees", "id", "department_id");
    let swapped = swap_direction(&edge);

    assert_eq!(swapped.source.as_str(), "employees");
    assert_eq!(swapped.target.as_str(), "departments");
    assert_eq!(swapped.source_field.as_deref(), Some("department_id"));
    assert_eq!(swapped.target_field.as_deref(), Some("id"));
    assert_eq!(swapped.cardinality, Cardinality::ManyToOne);
}

#[test]
fn test_swap_preserves_symmetric_cardinalities() {
    for cardinality in [Cardinality::OneToOne, Cardinality::ManyToMany] {
        let mut edge = drawn("a", "b", "left", "right");
        edge.cardinality = cardinality;
        let swapped = swap_direction(&edge);
        assert_eq!(swapped.cardinality, cardinality);
        assert_eq!(swapped.source.as_str(), "b");
    }
}

#[test]
fn test_swap_never_changes_the_connected_pair() {
    let edge = drawn("departments", "employees", "id", "department_id");
    let swapped = swap_direction(&edge);
    assert_eq!(edge.unordered_pair(), swapped.unordered_pair());
}

#[test]
fn test_label_reads_parent_verb_child() {
    let edge = drawn("departments", "employees", "id", "department_id");
    assert_eq!(
        edge_label(&edge, "Department", "Employee"),
        "Department has many Employee"
    );

    let swapped = swap_direction(&edge);
    assert_eq!(
        edge_label(&swapped, "Employee", "Department"),
        "Employee belongs to Department"
    );

    let mut custom = drawn("departments", "employees", "id", "department_id");
    custom.label = Some("employs".into());
    assert_eq!(edge_label(&custom, "Department", "Employee"), "employs");
}
