//! Relationship inference: raw scanned tests → canonical relationships.
//!
//! The engine normalizes scanned test definitions into [`RawCandidate`]
//! records, resolves both endpoints to known entities, and emits
//! parent → child relationships. Malformed or unresolvable candidates are
//! dropped locally with a diagnostic; they never abort a scan. Output
//! ordering is irrelevant — the aggregator makes the pipeline idempotent.

use std::collections::HashMap;

use tracing::debug;

use crate::model::{Cardinality, Entity, EntityId, Node, Position, Relationship, TestAnchor};
use crate::schema::{ModelRef, RawCandidate, ScannedTest};

/// Grid placement for entities created by inference.
const GRID_COLUMNS: usize = 4;
const GRID_SPACING_X: f64 = 400.0;
const GRID_SPACING_Y: f64 = 280.0;

// ============================================================================
// Model resolution
// ============================================================================

/// Mapping from a physical model reference to a known entity.
pub trait ModelResolver {
    /// Resolve a (possibly versioned or aliased) model reference to the
    /// entity currently representing it, or `None` if no entity binds it.
    fn resolve(&self, model: &ModelRef) -> Option<EntityId>;
}

/// Lookup-table resolver over the working set of entities.
///
/// Built in a single pass; resolution tries, in order: an exact binding
/// match, a version-stripped binding match, then the entity's own
/// name or id (case-insensitive) as an alias.
#[derive(Debug, Default)]
pub struct EntityIndex {
    bindings: HashMap<String, EntityId>,
    aliases: HashMap<String, EntityId>,
}

impl EntityIndex {
    pub fn from_nodes(nodes: &[Node]) -> Self {
        let mut index = Self::default();
        for node in nodes {
            let Some(entity) = node.as_entity() else {
                continue;
            };
            for binding in &entity.bindings {
                index
                    .bindings
                    .entry(binding.model.clone())
                    .or_insert_with(|| entity.id.clone());
            }
            index
                .aliases
                .entry(entity.name.to_lowercase())
                .or_insert_with(|| entity.id.clone());
            index
                .aliases
                .entry(entity.id.as_str().to_lowercase())
                .or_insert_with(|| entity.id.clone());
        }
        index
    }
}

impl ModelResolver for EntityIndex {
    fn resolve(&self, model: &ModelRef) -> Option<EntityId> {
        if let Some(id) = self.bindings.get(&model.name) {
            return Some(id.clone());
        }
        if let Some(id) = self.bindings.get(model.base_name()) {
            return Some(id.clone());
        }
        self.aliases
            .get(&model.name.to_lowercase())
            .or_else(|| self.aliases.get(&model.base_name().to_lowercase()))
            .cloned()
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the inference engine.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Cardinality assigned when the test metadata states nothing.
    pub default_cardinality: Cardinality,
    /// Create entities for referenced models with no entity yet, instead
    /// of dropping the candidate. Off by default.
    pub create_missing_entities: bool,
    /// Carry test tags onto the emitted relationships.
    pub keep_tags: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            default_cardinality: Cardinality::OneToMany,
            create_missing_entities: false,
            keep_tags: true,
        }
    }
}

impl InferenceConfig {
    /// Builder: create entities for unresolved referenced models.
    pub fn with_missing_entities(mut self, enabled: bool) -> Self {
        self.create_missing_entities = enabled;
        self
    }

    /// Builder: set the fallback cardinality.
    pub fn with_default_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.default_cardinality = cardinality;
        self
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Result of one inference pass.
#[derive(Debug, Default)]
pub struct InferenceOutcome {
    /// Canonical relationships, parent → child.
    pub relationships: Vec<Relationship>,
    /// Entities created for previously-unknown referenced models (only
    /// when `create_missing_entities` is enabled).
    pub new_entities: Vec<Entity>,
    /// Tests skipped for missing `to`/`field`.
    pub skipped_malformed: usize,
    /// Candidates dropped because an endpoint did not resolve.
    pub skipped_unresolved: usize,
}

/// Maps declarative foreign-key tests to canonical relationships.
#[derive(Debug, Default)]
pub struct InferenceEngine {
    config: InferenceConfig,
}

impl InferenceEngine {
    pub fn new(config: InferenceConfig) -> Self {
        Self { config }
    }

    /// Normalize scanned tests, skipping malformed definitions.
    pub fn normalize(&self, tests: &[ScannedTest]) -> (Vec<RawCandidate>, usize) {
        let mut candidates = Vec::with_capacity(tests.len());
        let mut skipped = 0usize;
        for test in tests {
            match RawCandidate::from_scanned(test) {
                Some(candidate) => candidates.push(candidate),
                None => {
                    skipped += 1;
                    debug!(
                        model = %test.model,
                        column = %test.column,
                        "skipping malformed relationship test (missing to/field)"
                    );
                }
            }
        }
        (candidates, skipped)
    }

    /// Full pass: normalize, resolve endpoints, emit relationships.
    ///
    /// `entity_count` seeds grid placement for any entities this pass
    /// creates (number of entities already on the canvas).
    pub fn infer(
        &self,
        tests: &[ScannedTest],
        resolver: &dyn ModelResolver,
        entity_count: usize,
    ) -> InferenceOutcome {
        let (candidates, skipped_malformed) = self.normalize(tests);
        let mut outcome = InferenceOutcome {
            skipped_malformed,
            ..Default::default()
        };

        // Entities created during this pass, so several candidates can
        // reference the same new model.
        let mut created: HashMap<String, EntityId> = HashMap::new();

        for candidate in &candidates {
            let child = self.resolve_endpoint(&candidate.from_model, resolver, &created);
            let parent = self.resolve_endpoint(&candidate.to_model, resolver, &created);

            let (parent, child) = match (parent, child) {
                (Some(parent), Some(child)) => (parent, child),
                (parent, child) => {
                    if self.config.create_missing_entities {
                        let parent = parent.unwrap_or_else(|| {
                            self.create_entity(
                                &candidate.to_model,
                                entity_count + created.len(),
                                &mut created,
                                &mut outcome.new_entities,
                            )
                        });
                        let child = child.unwrap_or_else(|| {
                            self.create_entity(
                                &candidate.from_model,
                                entity_count + created.len(),
                                &mut created,
                                &mut outcome.new_entities,
                            )
                        });
                        (parent, child)
                    } else {
                        outcome.skipped_unresolved += 1;
                        debug!(
                            from = %candidate.from_model,
                            to = %candidate.to_model,
                            "dropping candidate with unresolvable model reference"
                        );
                        continue;
                    }
                }
            };

            outcome
                .relationships
                .push(self.emit(candidate, parent, child));
        }

        outcome
    }

    fn resolve_endpoint(
        &self,
        model: &ModelRef,
        resolver: &dyn ModelResolver,
        created: &HashMap<String, EntityId>,
    ) -> Option<EntityId> {
        resolver
            .resolve(model)
            .or_else(|| created.get(model.base_name()).cloned())
    }

    fn create_entity(
        &self,
        model: &ModelRef,
        index: usize,
        created: &mut HashMap<String, EntityId>,
        new_entities: &mut Vec<Entity>,
    ) -> EntityId {
        let base = model.base_name().to_string();
        if let Some(id) = created.get(&base) {
            return id.clone();
        }
        let position = grid_position(index);
        let entity = Entity::new(base.clone(), base.clone())
            .with_binding(base.clone())
            .at(position.x, position.y);
        let id = entity.id.clone();
        created.insert(base, id.clone());
        new_entities.push(entity);
        id
    }

    /// Emit the canonical relationship for one resolved candidate.
    ///
    /// Direction by construction: `source` is the referenced model's
    /// entity (parent, "1" side), `target` the entity of the model
    /// carrying the foreign key (child, "*" side).
    fn emit(&self, candidate: &RawCandidate, parent: EntityId, child: EntityId) -> Relationship {
        let id = format!(
            "{}.{}->{}.{}",
            parent, candidate.to_column, child, candidate.from_column
        );
        let mut rel = Relationship::new(
            id,
            parent.as_str(),
            child.as_str(),
            candidate
                .cardinality
                .unwrap_or(self.config.default_cardinality),
        )
        .with_fields(&candidate.to_column, &candidate.from_column);
        rel.test_anchor = Some(TestAnchor::new(
            candidate.from_model.base_name(),
            &candidate.from_column,
        ));
        if self.config.keep_tags {
            rel.tags = candidate.tags.clone();
        }
        rel
    }
}

/// Grid placement for the nth entity added to the canvas.
pub fn grid_position(index: usize) -> Position {
    Position::new(
        (index % GRID_COLUMNS) as f64 * GRID_SPACING_X,
        (index / GRID_COLUMNS) as f64 * GRID_SPACING_Y,
    )
}
