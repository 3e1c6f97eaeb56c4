//! The in-memory state container and orchestration shell.
//!
//! [`Workspace`] owns the node and relationship collections plus the queue
//! of stale test anchors awaiting removal. The engine layers stay pure;
//! every mutation here derives a new collection and replaces the old one
//! wholesale, so a render pass never observes a half-updated edge set.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregate::{find_merged, AggregationMode, Aggregator};
use crate::direction::{self, ColumnCatalog};
use crate::geometry::{
    build_edge_path, compute_connection_info, compute_label_position, compute_parallel_offset,
    marker_transform, ConnectionInfo, EdgeLayout, Point,
};
use crate::graph::DiagramGraph;
use crate::inference::{EntityIndex, InferenceConfig, InferenceEngine};
use crate::model::{
    Entity, EntityId, Group, Node, Relationship, RelationshipId, RelationshipOrigin, TestAnchor,
};
use crate::schema::SchemaScanner;
use crate::sync::{SyncError, SyncPlan, SyncWriter, WriteResult};

/// Errors from workspace operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("unknown entity: '{0}'")]
    UnknownEntity(EntityId),

    #[error("unknown relationship: '{0}'")]
    UnknownRelationship(RelationshipId),

    #[error("duplicate node id: '{0}'")]
    DuplicateNode(EntityId),

    #[error("failed to read or write diagram file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid diagram document: {0}")]
    Document(#[from] serde_json::Error),
}

/// Serialized form of the diagram: the persisted records and nothing else.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagramDocument {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// Summary of one pull.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PullReport {
    /// Relationships emitted by inference this pass.
    pub inferred: usize,
    /// Edge-set size after aggregation.
    pub total: usize,
    /// Entities created for newly-referenced models.
    pub created_entities: usize,
    pub skipped_malformed: usize,
    pub skipped_unresolved: usize,
}

/// The single-threaded state container driving the editor core.
#[derive(Debug, Default)]
pub struct Workspace {
    nodes: Vec<Node>,
    relationships: Vec<Relationship>,
    /// Stale anchors queued by swaps, consumed by the next push.
    pending_removals: Vec<TestAnchor>,
    aggregation_mode: AggregationMode,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the global aggregation keying mode.
    pub fn with_aggregation_mode(mut self, mode: AggregationMode) -> Self {
        self.aggregation_mode = mode;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn pending_removals(&self) -> &[TestAnchor] {
        &self.pending_removals
    }

    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.nodes
            .iter()
            .filter_map(Node::as_entity)
            .find(|e| &e.id == id)
    }

    pub fn relationship(&self, id: &RelationshipId) -> Option<&Relationship> {
        self.relationships.iter().find(|r| &r.id == id)
    }

    fn entity_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.as_entity().is_some()).count()
    }

    /// Display label for an edge, following the parent → child convention.
    pub fn label_for(&self, rel: &Relationship) -> String {
        let name = |id: &EntityId| {
            self.entity(id)
                .map(|e| e.name.clone())
                .unwrap_or_else(|| id.as_str().to_string())
        };
        direction::edge_label(rel, &name(&rel.source), &name(&rel.target))
    }

    // ------------------------------------------------------------------
    // Node mutation
    // ------------------------------------------------------------------

    pub fn add_entity(&mut self, entity: Entity) -> Result<(), WorkspaceError> {
        self.add_node(Node::Entity(entity))
    }

    pub fn add_group(&mut self, group: Group) -> Result<(), WorkspaceError> {
        self.add_node(Node::Group(group))
    }

    fn add_node(&mut self, node: Node) -> Result<(), WorkspaceError> {
        if self.nodes.iter().any(|n| n.id() == node.id()) {
            return Err(WorkspaceError::DuplicateNode(node.id().clone()));
        }
        let mut next = self.nodes.clone();
        next.push(node);
        self.nodes = next;
        Ok(())
    }

    /// Delete a node and every relationship touching it; children of a
    /// deleted group are lifted to the top level.
    pub fn remove_node(&mut self, id: &EntityId) -> Result<(), WorkspaceError> {
        if !self.nodes.iter().any(|n| n.id() == id) {
            return Err(WorkspaceError::UnknownEntity(id.clone()));
        }
        let nodes: Vec<Node> = self
            .nodes
            .iter()
            .filter(|n| n.id() != id)
            .cloned()
            .map(|mut node| {
                let parent = match &mut node {
                    Node::Entity(e) => &mut e.parent,
                    Node::Group(g) => &mut g.parent,
                };
                if parent.as_ref() == Some(id) {
                    *parent = None;
                }
                node
            })
            .collect();
        let relationships: Vec<Relationship> = self
            .relationships
            .iter()
            .filter(|r| &r.source != id && &r.target != id)
            .cloned()
            .collect();
        self.nodes = nodes;
        self.relationships = relationships;
        Ok(())
    }

    pub fn move_entity(&mut self, id: &EntityId, x: f64, y: f64) -> Result<(), WorkspaceError> {
        self.update_entity(id, |e| e.position = crate::model::Position::new(x, y))
    }

    /// Bind an entity to a physical model. The generic edges of a
    /// previously-unbound entity pick up field mappings on the next pull.
    pub fn bind_entity(&mut self, id: &EntityId, model: &str) -> Result<(), WorkspaceError> {
        self.update_entity(id, |e| {
            if !e.binds_model(model) {
                let active = e.bindings.is_empty();
                e.bindings.push(crate::model::ModelBinding {
                    model: model.to_string(),
                    active,
                });
            }
        })
    }

    fn update_entity(
        &mut self,
        id: &EntityId,
        apply: impl FnOnce(&mut Entity),
    ) -> Result<(), WorkspaceError> {
        let mut next = self.nodes.clone();
        let entity = next
            .iter_mut()
            .filter_map(|n| match n {
                Node::Entity(e) if &e.id == id => Some(e),
                _ => None,
            })
            .next()
            .ok_or_else(|| WorkspaceError::UnknownEntity(id.clone()))?;
        apply(entity);
        self.nodes = next;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Edge mutation
    // ------------------------------------------------------------------

    /// Create an edge interactively between two entities.
    ///
    /// The draw direction is normalized against catalog metadata when
    /// available, the edge is anchored on its child side, and the result
    /// is merged through the aggregator — connecting an already-related
    /// field pair converges on the existing edge.
    pub fn connect(
        &mut self,
        source: &EntityId,
        target: &EntityId,
        fields: Option<(String, String)>,
        catalog: &dyn ColumnCatalog,
    ) -> Result<RelationshipId, WorkspaceError> {
        let source_entity = self
            .entity(source)
            .ok_or_else(|| WorkspaceError::UnknownEntity(source.clone()))?;
        let target_entity = self
            .entity(target)
            .ok_or_else(|| WorkspaceError::UnknownEntity(target.clone()))?;

        let mut candidate = Relationship::new(
            RelationshipId::generate().as_str(),
            source.as_str(),
            target.as_str(),
            crate::model::Cardinality::OneToMany,
        )
        .drawn();
        if let Some((source_field, target_field)) = fields {
            candidate = candidate.with_fields(source_field, target_field);
        }

        let source_model = source_entity.active_binding().map(|b| b.model.clone());
        let target_model = target_entity.active_binding().map(|b| b.model.clone());
        let mut candidate = direction::normalize_drawn(
            candidate,
            source_model.as_deref(),
            target_model.as_deref(),
            catalog,
        );
        candidate.test_anchor = self.child_anchor(&candidate);

        let aggregator = Aggregator::from_nodes(self.aggregation_mode, &self.nodes);
        let mode = aggregator.effective_mode(&candidate.source, &candidate.target);
        let probe = candidate.clone();
        let next = aggregator.merge_into(self.relationships.clone(), candidate);
        let id = find_merged(&next, &probe, mode)
            .map(|r| r.id.clone())
            .unwrap_or(probe.id);
        self.relationships = next;
        Ok(id)
    }

    /// Exchange the parent/child roles of an edge.
    ///
    /// The stale test anchor is queued for removal on the next push and a
    /// fresh anchor is resolved on the new child side.
    pub fn swap(&mut self, id: &RelationshipId) -> Result<(), WorkspaceError> {
        let index = self
            .relationships
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| WorkspaceError::UnknownRelationship(id.clone()))?;

        let stale = self.relationships[index].test_anchor.clone();
        let mut swapped = direction::swap_direction(&self.relationships[index]);
        swapped.test_anchor = self.child_anchor(&swapped);

        if let Some(stale) = stale {
            if swapped.test_anchor.as_ref() != Some(&stale)
                && !self.pending_removals.contains(&stale)
            {
                let mut pending = self.pending_removals.clone();
                pending.push(stale);
                self.pending_removals = pending;
            }
        }

        let mut next = self.relationships.clone();
        next[index] = swapped;
        self.relationships = next;
        Ok(())
    }

    pub fn set_label_offset(
        &mut self,
        id: &RelationshipId,
        dx: f64,
        dy: f64,
    ) -> Result<(), WorkspaceError> {
        let index = self
            .relationships
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| WorkspaceError::UnknownRelationship(id.clone()))?;
        let mut next = self.relationships.clone();
        next[index].label_offset = crate::model::LabelOffset::new(dx, dy);
        self.relationships = next;
        Ok(())
    }

    /// Anchor location on an edge's child side: the target entity's
    /// active binding plus the child foreign-key column.
    fn child_anchor(&self, rel: &Relationship) -> Option<TestAnchor> {
        let column = rel.target_field.clone()?;
        let model = self
            .entity(&rel.target)
            .and_then(|e| e.active_binding())
            .map(|b| b.model.clone())?;
        Some(TestAnchor::new(model, column))
    }

    // ------------------------------------------------------------------
    // Pull / push
    // ------------------------------------------------------------------

    /// Full inference + aggregation pipeline; safe to call repeatedly.
    ///
    /// Scan failure leaves the workspace untouched. Inference is additive:
    /// user-drawn edges survive, duplicates collapse, generic edges are
    /// upgraded in place.
    pub fn pull(
        &mut self,
        scanner: &dyn SchemaScanner,
        paths: &[PathBuf],
        config: &InferenceConfig,
    ) -> Result<PullReport, SyncError> {
        let tests = scanner.scan(paths).map_err(|source| SyncError::Scan {
            affected: self.relationships.len(),
            source,
        })?;

        let index = EntityIndex::from_nodes(&self.nodes);
        let engine = InferenceEngine::new(config.clone());
        let outcome = engine.infer(&tests, &index, self.entity_count());

        let mut nodes = self.nodes.clone();
        nodes.extend(outcome.new_entities.iter().cloned().map(Node::Entity));

        let aggregator = Aggregator::from_nodes(self.aggregation_mode, &nodes);
        let merged = aggregator.aggregate(
            self.relationships
                .iter()
                .cloned()
                .chain(outcome.relationships.iter().cloned()),
        );

        let report = PullReport {
            inferred: outcome.relationships.len(),
            total: merged.len(),
            created_entities: outcome.new_entities.len(),
            skipped_malformed: outcome.skipped_malformed,
            skipped_unresolved: outcome.skipped_unresolved,
        };
        info!(
            inferred = report.inferred,
            total = report.total,
            "pull merged inferred relationships"
        );

        self.nodes = nodes;
        self.relationships = merged;
        Ok(report)
    }

    /// Persist the canonical edge set as one atomic batch.
    ///
    /// The writer receives a deduplicated, direction-normalized plan with
    /// any post-swap anchors flagged for removal at their old location.
    /// On failure the edge set and the pending queue are left unchanged.
    pub fn push(&mut self, writer: &mut dyn SyncWriter) -> Result<WriteResult, SyncError> {
        let plan = SyncPlan::build(&self.nodes, &self.relationships, &self.pending_removals);
        let result = writer.write(&plan)?;
        self.pending_removals = Vec::new();
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Compute render geometry for every edge with both endpoints on the
    /// canvas. Pure arithmetic over current positions and sizes.
    pub fn layout(&self) -> Vec<EdgeLayout> {
        let graph = DiagramGraph::build(&self.nodes, &self.relationships);
        self.relationships
            .iter()
            .filter_map(|rel| {
                let source = self.entity(&rel.source);
                let target = self.entity(&rel.target);
                let (Some(source), Some(target)) = (source, target) else {
                    debug!(id = %rel.id, "edge endpoint missing from canvas, skipped in layout");
                    return None;
                };

                let conn = compute_connection_info(source, target, &self.nodes);
                let (index, total) = graph.parallel_position(&rel.id);
                let offset = compute_parallel_offset(index, total);
                let (source_point, target_point) = offset_points(&conn, offset);

                Some(EdgeLayout {
                    relationship_id: rel.id.clone(),
                    connection: conn,
                    path: build_edge_path(&conn, offset, rel.label_offset),
                    label: compute_label_position(&conn, offset, rel.label_offset),
                    source_marker: marker_transform(source_point, conn.source_side),
                    target_marker: marker_transform(target_point, conn.target_side),
                })
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Persistence of the diagram records
    // ------------------------------------------------------------------

    pub fn to_document(&self) -> DiagramDocument {
        DiagramDocument {
            nodes: self.nodes.clone(),
            relationships: self.relationships.clone(),
        }
    }

    pub fn from_document(document: DiagramDocument) -> Self {
        Self {
            nodes: document.nodes,
            relationships: document.relationships,
            pending_removals: Vec::new(),
            aggregation_mode: AggregationMode::default(),
        }
    }

    pub fn save_file(&self, path: &Path) -> Result<(), WorkspaceError> {
        let body = serde_json::to_string_pretty(&self.to_document())?;
        fs::write(path, body)?;
        Ok(())
    }

    pub fn load_file(path: &Path) -> Result<Self, WorkspaceError> {
        let body = fs::read_to_string(path)?;
        let document: DiagramDocument = serde_json::from_str(&body)?;
        Ok(Self::from_document(document))
    }

    /// Count of user-drawn edges (kept across pulls).
    pub fn drawn_count(&self) -> usize {
        self.relationships
            .iter()
            .filter(|r| r.origin == RelationshipOrigin::UserDrawn)
            .count()
    }
}

/// Connection points with the parallel offset applied on the axis
/// perpendicular to travel; self-edges are left as-is.
fn offset_points(conn: &ConnectionInfo, offset: f64) -> (Point, Point) {
    if conn.is_self_edge {
        return (conn.source_point, conn.target_point);
    }
    if conn.source_side.is_horizontal() {
        (
            Point::new(conn.source_point.x, conn.source_point.y + offset),
            Point::new(conn.target_point.x, conn.target_point.y + offset),
        )
    } else {
        (
            Point::new(conn.source_point.x + offset, conn.source_point.y),
            Point::new(conn.target_point.x + offset, conn.target_point.y),
        )
    }
}
