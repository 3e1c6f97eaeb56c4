//! Edge geometry: connection sides, parallel offsets, paths, labels,
//! markers.
//!
//! Every function here is a pure function of node positions, node sizes,
//! the edge's index among its parallel group, and stored/drag offsets —
//! no hidden state, so every output is exactly reproducible in tests.
//! Geometry is recomputed on every render pass and never persisted.

use serde::{Deserialize, Serialize};

use crate::model::{Entity, LabelOffset, Node, Position, Size};

/// Reference values used by the geometry calculations.
///
/// Named constants instead of magic numbers; each one is observable in
/// the emitted coordinates.
pub mod constants {
    /// Spacing between parallel edges sharing a connection-side pair.
    pub const EDGE_SPACING: f64 = 50.0;
    /// Radius of the outward cubic curve of a self-edge.
    pub const SELF_EDGE_RADIUS: f64 = 60.0;
    /// Extra readability padding between a self-edge curve and its label.
    pub const LABEL_PADDING: f64 = 20.0;
    /// Inward padding of arrow/crow's-foot markers from the border point.
    pub const MARKER_INSET: f64 = 8.0;
    /// Substitute width for a node with missing or degenerate size.
    pub const DEFAULT_WIDTH: f64 = 320.0;
    /// Substitute height for a node with missing or degenerate size.
    pub const DEFAULT_HEIGHT: f64 = 200.0;
    /// Height of a collapsed node box.
    pub const COLLAPSED_HEIGHT: f64 = 40.0;
    /// Header and padding chrome added on top of content height when a
    /// box is sized from its field list (see [`super::expanded_height`]).
    pub const CHROME_HEIGHT: f64 = 56.0;
}

use constants::*;

// ============================================================================
// Primitives
// ============================================================================

/// An absolute canvas coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Which border of a node an edge attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }

    /// Marker rotation in degrees, pointing back toward the owning node.
    pub fn marker_rotation(self) -> f64 {
        match self {
            Side::Bottom => 0.0,
            Side::Top => 180.0,
            Side::Left => 90.0,
            Side::Right => -90.0,
        }
    }
}

/// Absolute bounding box of a node at render time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NodeBox {
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Midpoint of one border edge.
    pub fn border_midpoint(&self, side: Side) -> Point {
        match side {
            Side::Left => Point::new(self.x, self.y + self.height / 2.0),
            Side::Right => Point::new(self.x + self.width, self.y + self.height / 2.0),
            Side::Top => Point::new(self.x + self.width / 2.0, self.y),
            Side::Bottom => Point::new(self.x + self.width / 2.0, self.y + self.height),
        }
    }
}

// ============================================================================
// Size and position resolution
// ============================================================================

/// Full box height for a node sized from its content.
pub fn expanded_height(content_height: f64) -> f64 {
    content_height + CHROME_HEIGHT
}

/// Effective render dimensions of a box.
///
/// A collapsed box renders at the fixed collapsed height. Missing or
/// degenerate dimensions fall back to the 320×200 defaults rather than
/// failing the render.
pub fn effective_size(size: &Size) -> (f64, f64) {
    let width = if size.width.is_finite() && size.width > 0.0 {
        size.width
    } else {
        DEFAULT_WIDTH
    };
    let height = if size.collapsed {
        COLLAPSED_HEIGHT
    } else if size.height.is_finite() && size.height > 0.0 {
        size.height
    } else {
        DEFAULT_HEIGHT
    };
    (width, height)
}

/// Absolute position of a node: its local position plus the positions of
/// every ancestor group.
pub fn absolute_position(node: &Node, all_nodes: &[Node]) -> Position {
    let mut position = node.position();
    let mut current = node.parent();
    // Hop limit guards against a malformed parent cycle.
    let mut hops = 0usize;
    while let Some(parent_id) = current {
        if hops >= all_nodes.len() {
            break;
        }
        hops += 1;
        match all_nodes.iter().find(|n| n.id() == parent_id) {
            Some(parent) => {
                let p = parent.position();
                position = position.translated(p.x, p.y);
                current = parent.parent();
            }
            None => break,
        }
    }
    position
}

/// Absolute bounding box of an entity.
pub fn node_box(entity: &Entity, all_nodes: &[Node]) -> NodeBox {
    let node = Node::Entity(entity.clone());
    let position = absolute_position(&node, all_nodes);
    let (width, height) = effective_size(&entity.size);
    NodeBox {
        x: position.x,
        y: position.y,
        width,
        height,
    }
}

// ============================================================================
// Connection info
// ============================================================================

/// Where an edge attaches: sides and border points on both endpoints.
///
/// Recomputed from current positions/sizes on every render pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub source_side: Side,
    pub target_side: Side,
    pub source_point: Point,
    pub target_point: Point,
    pub is_self_edge: bool,
}

/// Choose connection sides and border points for an edge.
///
/// Side selection compares the absolute center-to-center delta: when
/// |dx| ≥ |dy| the edge runs horizontally (right → left, or left → right
/// when the target lies to the left), otherwise vertically. A self-edge
/// always exits and re-enters on the right border, from its top corner to
/// its bottom corner.
pub fn compute_connection_info(
    source: &Entity,
    target: &Entity,
    all_nodes: &[Node],
) -> ConnectionInfo {
    let source_box = node_box(source, all_nodes);

    if source.id == target.id {
        let x = source_box.x + source_box.width;
        return ConnectionInfo {
            source_side: Side::Right,
            target_side: Side::Right,
            source_point: Point::new(x, source_box.y),
            target_point: Point::new(x, source_box.y + source_box.height),
            is_self_edge: true,
        };
    }

    let target_box = node_box(target, all_nodes);
    let source_center = source_box.center();
    let target_center = target_box.center();
    let dx = target_center.x - source_center.x;
    let dy = target_center.y - source_center.y;

    let (source_side, target_side) = if dx.abs() >= dy.abs() {
        if dx >= 0.0 {
            (Side::Right, Side::Left)
        } else {
            (Side::Left, Side::Right)
        }
    } else if dy >= 0.0 {
        (Side::Bottom, Side::Top)
    } else {
        (Side::Top, Side::Bottom)
    };

    ConnectionInfo {
        source_side,
        target_side,
        source_point: source_box.border_midpoint(source_side),
        target_point: target_box.border_midpoint(target_side),
        is_self_edge: false,
    }
}

// ============================================================================
// Parallel offsets
// ============================================================================

/// Perpendicular offset of edge `index` among `total` parallel edges.
///
/// Spreads the group symmetrically about the centerline:
/// `offset(i) = i·S − (N−1)·S/2`. Three edges yield `[-50, 0, 50]`.
pub fn compute_parallel_offset(index: usize, total: usize) -> f64 {
    if total <= 1 {
        return 0.0;
    }
    index as f64 * EDGE_SPACING - (total as f64 - 1.0) * EDGE_SPACING / 2.0
}

// ============================================================================
// Path construction
// ============================================================================

/// Format a coordinate, normalizing -0.0 to 0.
fn coord(v: f64) -> String {
    let v = if v == 0.0 { 0.0 } else { v };
    format!("{}", v)
}

/// Build the path string for an edge.
///
/// Regular edges take an orthogonal route: perpendicular exit from the
/// source border, one turn at the midline (shifted by the user-dragged
/// label offset), perpendicular entry into the target border. The
/// parallel offset moves the whole run perpendicular to the travel axis.
/// Self-edges bulge outward as a cubic curve of fixed radius.
pub fn build_edge_path(
    conn: &ConnectionInfo,
    parallel_offset: f64,
    label_offset: LabelOffset,
) -> String {
    if conn.is_self_edge {
        let x = conn.source_point.x;
        let y0 = conn.source_point.y;
        let y1 = conn.target_point.y;
        let cx = x + SELF_EDGE_RADIUS + parallel_offset;
        return format!(
            "M {} {} C {} {}, {} {}, {} {}",
            coord(x),
            coord(y0),
            coord(cx),
            coord(y0),
            coord(cx),
            coord(y1),
            coord(x),
            coord(y1)
        );
    }

    if conn.source_side.is_horizontal() {
        let sy = conn.source_point.y + parallel_offset;
        let ty = conn.target_point.y + parallel_offset;
        let sx = conn.source_point.x;
        let tx = conn.target_point.x;
        let mx = (sx + tx) / 2.0 + label_offset.dx;
        format!(
            "M {} {} L {} {} L {} {} L {} {}",
            coord(sx),
            coord(sy),
            coord(mx),
            coord(sy),
            coord(mx),
            coord(ty),
            coord(tx),
            coord(ty)
        )
    } else {
        let sx = conn.source_point.x + parallel_offset;
        let tx = conn.target_point.x + parallel_offset;
        let sy = conn.source_point.y;
        let ty = conn.target_point.y;
        let my = (sy + ty) / 2.0 + label_offset.dy;
        format!(
            "M {} {} L {} {} L {} {} L {} {}",
            coord(sx),
            coord(sy),
            coord(sx),
            coord(my),
            coord(tx),
            coord(my),
            coord(tx),
            coord(ty)
        )
    }
}

// ============================================================================
// Label placement
// ============================================================================

/// Position of an edge's label.
///
/// Regular edges: the path midpoint, plus the stored/drag offsets.
/// Self-edges: pushed outward past the curve by radius + padding,
/// vertically centered between exit and entry.
pub fn compute_label_position(
    conn: &ConnectionInfo,
    parallel_offset: f64,
    label_offset: LabelOffset,
) -> Point {
    if conn.is_self_edge {
        return Point::new(
            conn.source_point.x + SELF_EDGE_RADIUS + LABEL_PADDING + label_offset.dx,
            (conn.source_point.y + conn.target_point.y) / 2.0 + label_offset.dy,
        );
    }

    if conn.source_side.is_horizontal() {
        let sy = conn.source_point.y + parallel_offset;
        let ty = conn.target_point.y + parallel_offset;
        Point::new(
            (conn.source_point.x + conn.target_point.x) / 2.0 + label_offset.dx,
            (sy + ty) / 2.0 + label_offset.dy,
        )
    } else {
        let sx = conn.source_point.x + parallel_offset;
        let tx = conn.target_point.x + parallel_offset;
        Point::new(
            (sx + tx) / 2.0 + label_offset.dx,
            (conn.source_point.y + conn.target_point.y) / 2.0 + label_offset.dy,
        )
    }
}

// ============================================================================
// Markers
// ============================================================================

/// Placement of an arrow/crow's-foot decoration at one edge endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerPlacement {
    pub position: Point,
    /// Rotation in degrees; the marker visually points back toward its
    /// own node (0° bottom exit, 180° top, 90° left, −90° right).
    pub rotation: f64,
}

/// Place a marker with a small inward padding from the raw border point,
/// shifted along the exit axis into the edge.
pub fn marker_transform(point: Point, side: Side) -> MarkerPlacement {
    let position = match side {
        Side::Right => Point::new(point.x + MARKER_INSET, point.y),
        Side::Left => Point::new(point.x - MARKER_INSET, point.y),
        Side::Bottom => Point::new(point.x, point.y + MARKER_INSET),
        Side::Top => Point::new(point.x, point.y - MARKER_INSET),
    };
    MarkerPlacement {
        position,
        rotation: side.marker_rotation(),
    }
}

// ============================================================================
// Per-edge layout record
// ============================================================================

/// Fully-computed render geometry for one edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeLayout {
    pub relationship_id: crate::model::RelationshipId,
    pub connection: ConnectionInfo,
    pub path: String,
    pub label: Point,
    pub source_marker: MarkerPlacement,
    pub target_marker: MarkerPlacement,
}
