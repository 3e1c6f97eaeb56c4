use erdsync::geometry::{
    compute_connection_info, constants, effective_size, expanded_height, node_box, Point, Side,
};
use erdsync::model::{Entity, Group, Node, Position, Size};

fn entity(id: &str, x: f64, y: f64, w: f64, h: f64) -> Entity {
    Entity::new(id, id).at(x, y).sized(w, h)
}

#[test]
fn test_horizontal_neighbors_connect_right_to_left() {
    let a = entity("a", 0.0, 0.0, 100.0, 100.0);
    let b = entity("b", 200.0, 0.0, 100.0, 100.0);
    let nodes = vec![Node::Entity(a.clone()), Node::Entity(b.clone())];

    let conn = compute_connection_info(&a, &b, &nodes);
    assert_eq!(conn.source_side, Side::Right);
    assert_eq!(conn.target_side, Side::Left);
    assert_eq!(conn.source_point, Point::new(100.0, 50.0));
    assert_eq!(conn.target_point, Point::new(200.0, 50.0));
    assert!(!conn.is_self_edge);
}

#[test]
fn test_target_to_the_left_connects_left_to_right() {
    let a = entity("a", 300.0, 0.0, 100.0, 100.0);
    let b = entity("b", 0.0, 0.0, 100.0, 100.0);
    let nodes = vec![Node::Entity(a.clone()), Node::Entity(b.clone())];

    let conn = compute_connection_info(&a, &b, &nodes);
    assert_eq!(conn.source_side, Side::Left);
    assert_eq!(conn.target_side, Side::Right);
    assert_eq!(conn.source_point, Point::new(300.0, 50.0));
    assert_eq!(conn.target_point, Point::new(100.0, 50.0));
}

#[test]
fn test_vertical_dominant_delta_connects_bottom_to_top() {
    let a = entity("a", 0.0, 0.0, 100.0, 100.0);
    let b = entity("b", 40.0, 300.0, 100.0, 100.0);
    let nodes = vec![Node::Entity(a.clone()), Node::Entity(b.clone())];

    let conn = compute_connection_info(&a, &b, &nodes);
    assert_eq!(conn.source_side, Side::Bottom);
    assert_eq!(conn.target_side, Side::Top);
    assert_eq!(conn.source_point, Point::new(50.0, 100.0));
    assert_eq!(conn.target_point, Point::new(90.0, 300.0));
}

#[test]
fn test_tie_between_axes_prefers_horizontal() {
    let a = entity("a", 0.0, 0.0, 100.0, 100.0);
    let b = entity("b", 200.0, 200.0, 100.0, 100.0);
    let nodes = vec![Node::Entity(a.clone()), Node::Entity(b.clone())];

    let conn = compute_connection_info(&a, &b, &nodes);
    assert_eq!(conn.source_side, Side::Right);
}

#[test]
fn test_self_edge_uses_right_border_corners() {
    let mut a = entity("a", 0.0, 50.0, 100.0, 120.0);
    a.size.collapsed = true;
    let nodes = vec![Node::Entity(a.clone())];

    let conn = compute_connection_info(&a, &a, &nodes);
    assert!(conn.is_self_edge);
    assert_eq!(conn.source_side, Side::Right);
    assert_eq!(conn.target_side, Side::Right);
    assert_eq!(conn.source_point, Point::new(100.0, 50.0));
    assert_eq!(conn.target_point, Point::new(100.0, 90.0));
}

#[test]
fn test_nested_entity_uses_absolute_position() {
    let group = Group {
        id: "grp".into(),
        name: "Warehouse".into(),
        position: Position::new(500.0, 300.0),
        parent: None,
    };
    let mut inner = entity("inner", 10.0, 20.0, 100.0, 100.0);
    inner.parent = Some("grp".into());
    let outer = entity("outer", 0.0, 320.0, 100.0, 100.0);
    let nodes = vec![
        Node::Group(group),
        Node::Entity(inner.clone()),
        Node::Entity(outer.clone()),
    ];

    let inner_box = node_box(&inner, &nodes);
    assert_eq!((inner_box.x, inner_box.y), (510.0, 320.0));

    // inner sits to the right of outer once its group offset applies
    let conn = compute_connection_info(&outer, &inner, &nodes);
    assert_eq!(conn.source_side, Side::Right);
    assert_eq!(conn.source_point, Point::new(100.0, 370.0));
    assert_eq!(conn.target_point, Point::new(510.0, 370.0));
}

#[test]
fn test_degenerate_size_falls_back_to_defaults() {
    let (w, h) = effective_size(&Size::new(0.0, f64::NAN));
    assert_eq!(w, constants::DEFAULT_WIDTH);
    assert_eq!(h, constants::DEFAULT_HEIGHT);

    // The render does not fail: the box is simply the default shape.
    let broken = entity("x", 0.0, 0.0, -5.0, 0.0);
    let nodes = vec![Node::Entity(broken.clone())];
    let b = node_box(&broken, &nodes);
    assert_eq!((b.width, b.height), (constants::DEFAULT_WIDTH, constants::DEFAULT_HEIGHT));
}

#[test]
fn test_expanded_box_adds_chrome_on_top_of_content() {
    let content = 144.0;
    let mut entity = entity("x", 0.0, 0.0, 100.0, 0.0);
    entity.size.height = expanded_height(content);

    let nodes = vec![Node::Entity(entity.clone())];
    let b = node_box(&entity, &nodes);
    assert_eq!(b.height, content + constants::CHROME_HEIGHT);
}

#[test]
fn test_collapsed_height_is_constant() {
    let mut collapsed = entity("c", 0.0, 0.0, 200.0, 500.0);
    collapsed.size.collapsed = true;
    assert_eq!(
        effective_size(&collapsed.size),
        (200.0, constants::COLLAPSED_HEIGHT)
    );
}
