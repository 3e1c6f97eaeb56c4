//! Core data model for the diagram.
//!
//! Defines the node types, relationship (edge) type, and supporting
//! geometry records shared by the inference, aggregation, and geometry
//! layers. Everything here is plain data with serde derives; behavior
//! lives in the engine modules.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// ============================================================================
// Identifiers
// ============================================================================

/// Stable identifier of a diagram node (entity or group).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a relationship edge.
///
/// Relationship identity for deduplication purposes is always the
/// entity/field pair key, never this literal id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipId(pub String);

impl RelationshipId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id for an interactively-created edge.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Geometry primitives
// ============================================================================

/// Canvas position of a node, local to its parent group (if any).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset this position by another (ancestor chain accumulation).
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Node box dimensions.
///
/// `height` is the content height; the effective render height depends on
/// the collapsed flag (see [`crate::geometry::effective_size`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub collapsed: bool,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            collapsed: false,
        }
    }
}

/// User-adjustable label drag offset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelOffset {
    pub dx: f64,
    pub dy: f64,
}

impl LabelOffset {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

// ============================================================================
// Cardinality
// ============================================================================

/// Cardinality of a relationship between two entities.
///
/// Invariant: for `OneToMany` the `source` endpoint is the "1" (parent)
/// side and `target` the "*" (child) side; `ManyToOne` is the reverse.
/// `OneToOne` and `ManyToMany` direction is arbitrary but stable once
/// created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// One-to-one relationship
    OneToOne,
    /// One-to-many relationship (source is the parent)
    OneToMany,
    /// Many-to-one relationship (target is the parent)
    ManyToOne,
    /// Many-to-many relationship
    ManyToMany,
}

impl Cardinality {
    /// Reverse the cardinality (swap which endpoint is the parent).
    pub fn reverse(self) -> Self {
        match self {
            Cardinality::OneToMany => Cardinality::ManyToOne,
            Cardinality::ManyToOne => Cardinality::OneToMany,
            Cardinality::OneToOne => Cardinality::OneToOne,
            Cardinality::ManyToMany => Cardinality::ManyToMany,
        }
    }

    /// Parse a metadata hint such as `one_to_many` or `1:N`.
    pub fn parse_hint(hint: &str) -> Option<Self> {
        match hint.trim().to_lowercase().as_str() {
            "one_to_one" | "1:1" => Some(Cardinality::OneToOne),
            "one_to_many" | "1:n" => Some(Cardinality::OneToMany),
            "many_to_one" | "n:1" => Some(Cardinality::ManyToOne),
            "many_to_many" | "n:n" => Some(Cardinality::ManyToMany),
            _ => None,
        }
    }

    /// Default connecting verb for the parent → child label convention.
    pub fn default_verb(self) -> &'static str {
        match self {
            Cardinality::OneToOne => "has one",
            Cardinality::OneToMany => "has many",
            Cardinality::ManyToOne => "belongs to",
            Cardinality::ManyToMany => "relates to",
        }
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cardinality::OneToOne => write!(f, "1:1"),
            Cardinality::OneToMany => write!(f, "1:N"),
            Cardinality::ManyToOne => write!(f, "N:1"),
            Cardinality::ManyToMany => write!(f, "N:N"),
        }
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// Binding of an entity to one physical model.
///
/// An entity may carry several bindings (e.g. a current table and a
/// historical table); exactly one should be active at render time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelBinding {
    /// Physical model name as it appears in schema documents.
    pub model: String,
    /// Whether this binding drives field-level display right now.
    #[serde(default)]
    pub active: bool,
}

impl ModelBinding {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            active: true,
        }
    }
}

/// A conceptual entity node on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Physical model bindings; empty for a greenfield (unbound) entity.
    #[serde(default)]
    pub bindings: Vec<ModelBinding>,
    pub position: Position,
    pub size: Size,
    /// Enclosing group, if nested.
    #[serde(default)]
    pub parent: Option<EntityId>,
}

impl Entity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(id),
            name: name.into(),
            bindings: Vec::new(),
            position: Position::default(),
            size: Size::new(
                crate::geometry::constants::DEFAULT_WIDTH,
                crate::geometry::constants::DEFAULT_HEIGHT,
            ),
            parent: None,
        }
    }

    /// Builder: bind to a physical model. The first binding becomes active.
    pub fn with_binding(mut self, model: impl Into<String>) -> Self {
        let active = self.bindings.is_empty();
        self.bindings.push(ModelBinding {
            model: model.into(),
            active,
        });
        self
    }

    /// Builder: set canvas position.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    /// Builder: set box size.
    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.size = Size::new(width, height);
        self
    }

    /// Does any binding (primary or additional) match this model name?
    pub fn binds_model(&self, model: &str) -> bool {
        self.bindings.iter().any(|b| b.model == model)
    }

    /// The binding currently driving field-level display.
    pub fn active_binding(&self) -> Option<&ModelBinding> {
        self.bindings
            .iter()
            .find(|b| b.active)
            .or_else(|| self.bindings.first())
    }

    /// Entities bound to more than one physical model aggregate their
    /// edges per entity pair rather than per field pair.
    pub fn is_multi_bound(&self) -> bool {
        self.bindings.len() > 1
    }

    pub fn is_bound(&self) -> bool {
        !self.bindings.is_empty()
    }
}

/// A group node enclosing other nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: EntityId,
    pub name: String,
    pub position: Position,
    #[serde(default)]
    pub parent: Option<EntityId>,
}

/// A node on the canvas: either an entity box or an enclosing group.
///
/// Explicit tagged union instead of an untyped key-value payload, so every
/// node kind carries exactly the fields it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Entity(Entity),
    Group(Group),
}

impl Node {
    pub fn id(&self) -> &EntityId {
        match self {
            Node::Entity(e) => &e.id,
            Node::Group(g) => &g.id,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Node::Entity(e) => e.position,
            Node::Group(g) => g.position,
        }
    }

    pub fn parent(&self) -> Option<&EntityId> {
        match self {
            Node::Entity(e) => e.parent.as_ref(),
            Node::Group(g) => g.parent.as_ref(),
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Node::Entity(e) => Some(e),
            Node::Group(_) => None,
        }
    }
}

// ============================================================================
// Relationships
// ============================================================================

/// Where a relationship came from.
///
/// Inference is additive only: a `UserDrawn` edge is never deleted by a
/// pull, only merged into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipOrigin {
    /// Discovered from a declarative foreign-key test.
    #[default]
    Inferred,
    /// Created interactively by connecting two nodes.
    UserDrawn,
}

/// Location of the declarative test backing a relationship: the child
/// model and the foreign-key column the test is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestAnchor {
    pub model: String,
    pub column: String,
}

impl TestAnchor {
    pub fn new(model: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            column: column.into(),
        }
    }
}

/// Field mapping contributed by one physical binding of a rolled-up edge.
///
/// When several physical references collapse into a single visual edge
/// (entity-pair aggregation), each binding keeps its own mapping here and
/// the one shown is picked at render time from the active binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldVariant {
    /// Child-side physical model this mapping belongs to.
    pub model: String,
    pub source_field: String,
    pub target_field: String,
}

/// A canonical edge between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    /// Parent ("1") side for `OneToMany`.
    pub source: EntityId,
    /// Child ("*") side for `OneToMany`.
    pub target: EntityId,
    pub cardinality: Cardinality,
    /// Referenced (parent) key; `None` for a generic, binding-less edge.
    #[serde(default)]
    pub source_field: Option<String>,
    /// Local (child) foreign-key column.
    #[serde(default)]
    pub target_field: Option<String>,
    /// User-set label; falls back to the cardinality verb convention.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub label_offset: LabelOffset,
    #[serde(default)]
    pub origin: RelationshipOrigin,
    /// Where the backing declarative test currently lives.
    #[serde(default)]
    pub test_anchor: Option<TestAnchor>,
    /// Metadata tags carried over from the scanned test definition.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Per-binding field mappings of a rolled-up edge.
    #[serde(default)]
    pub field_variants: Vec<FieldVariant>,
}

impl Relationship {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            id: RelationshipId::new(id),
            source: EntityId(source.into()),
            target: EntityId(target.into()),
            cardinality,
            source_field: None,
            target_field: None,
            label: None,
            label_offset: LabelOffset::default(),
            origin: RelationshipOrigin::default(),
            test_anchor: None,
            tags: BTreeSet::new(),
            field_variants: Vec::new(),
        }
    }

    /// Builder: set the field pair.
    pub fn with_fields(
        mut self,
        source_field: impl Into<String>,
        target_field: impl Into<String>,
    ) -> Self {
        self.source_field = Some(source_field.into());
        self.target_field = Some(target_field.into());
        self
    }

    /// Builder: mark as user-drawn.
    pub fn drawn(mut self) -> Self {
        self.origin = RelationshipOrigin::UserDrawn;
        self
    }

    /// A self-join: both endpoints are the same entity.
    pub fn is_self_edge(&self) -> bool {
        self.source == self.target
    }

    /// A generic edge carries no field mapping (drawn between unbound
    /// entities); it is upgraded in place when inference resolves fields.
    pub fn is_generic(&self) -> bool {
        self.source_field.is_none() && self.target_field.is_none()
    }

    /// Dedup key under field-pair aggregation.
    pub fn field_pair_key(&self) -> (EntityId, EntityId, Option<String>, Option<String>) {
        (
            self.source.clone(),
            self.target.clone(),
            self.source_field.clone(),
            self.target_field.clone(),
        )
    }

    /// Dedup key under entity-pair aggregation.
    pub fn entity_pair_key(&self) -> (EntityId, EntityId) {
        (self.source.clone(), self.target.clone())
    }

    /// Field pair to display for the given active child-side binding.
    ///
    /// Falls back to the primary mapping when no variant matches.
    pub fn fields_for_binding(&self, model: &str) -> (Option<&str>, Option<&str>) {
        if let Some(v) = self.field_variants.iter().find(|v| v.model == model) {
            (Some(v.source_field.as_str()), Some(v.target_field.as_str()))
        } else {
            (self.source_field.as_deref(), self.target_field.as_deref())
        }
    }

    /// Unordered endpoint pair, used for parallel-edge grouping.
    pub fn unordered_pair(&self) -> (EntityId, EntityId) {
        if self.source <= self.target {
            (self.source.clone(), self.target.clone())
        } else {
            (self.target.clone(), self.source.clone())
        }
    }
}
