//! Relationship aggregation: duplicate merging and entity-pair rollup.
//!
//! Merges inferred and user-drawn relationships into a minimal,
//! duplicate-free edge set. Aggregation is idempotent: re-running it over
//! an already-aggregated set reproduces the same set, with no duplicate
//! growth and no loss of manual label or offset edits. All operations
//! derive a new collection rather than editing one in place, so a caller
//! can replace its edge set wholesale.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{EntityId, FieldVariant, Node, Relationship};

/// How relationship identity is keyed during deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// One edge per ordered (source, target) + (source_field, target_field).
    #[default]
    FieldPair,
    /// One edge per ordered entity pair; field detail resolves at render
    /// time from the active binding (dimensional rollup).
    EntityPair,
}

/// Aggregates candidates into an edge set, picking the keying mode per
/// entity pair.
///
/// Pairs where either endpoint carries multiple physical bindings always
/// roll up per entity pair; everything else uses the configured mode.
#[derive(Debug, Default)]
pub struct Aggregator {
    mode: AggregationMode,
    multi_bound: HashSet<EntityId>,
}

impl Aggregator {
    pub fn new(mode: AggregationMode) -> Self {
        Self {
            mode,
            multi_bound: HashSet::new(),
        }
    }

    /// Build an aggregator that knows which entities are multi-bound.
    pub fn from_nodes(mode: AggregationMode, nodes: &[Node]) -> Self {
        let multi_bound = nodes
            .iter()
            .filter_map(Node::as_entity)
            .filter(|e| e.is_multi_bound())
            .map(|e| e.id.clone())
            .collect();
        Self { mode, multi_bound }
    }

    /// Effective keying mode for one entity pair.
    pub fn effective_mode(&self, source: &EntityId, target: &EntityId) -> AggregationMode {
        if self.multi_bound.contains(source) || self.multi_bound.contains(target) {
            AggregationMode::EntityPair
        } else {
            self.mode
        }
    }

    /// Merge one candidate into an edge set, returning the new set.
    pub fn merge_into(
        &self,
        edges: Vec<Relationship>,
        candidate: Relationship,
    ) -> Vec<Relationship> {
        let mode = self.effective_mode(&candidate.source, &candidate.target);
        merge_relationship_into(edges, candidate, mode)
    }

    /// Aggregate a whole sequence of relationships into a fresh set.
    pub fn aggregate<I>(&self, relationships: I) -> Vec<Relationship>
    where
        I: IntoIterator<Item = Relationship>,
    {
        relationships
            .into_iter()
            .fold(Vec::new(), |edges, rel| self.merge_into(edges, rel))
    }
}

/// Merge one candidate relationship into an edge set under the given
/// keying mode, returning the new set.
///
/// Resolution order:
/// 1. a duplicate under the mode's key absorbs the candidate,
/// 2. a generic (field-less) edge between the same two entities is
///    upgraded in place with the candidate's resolved mapping,
/// 3. otherwise the candidate is appended.
pub fn merge_relationship_into(
    mut edges: Vec<Relationship>,
    candidate: Relationship,
    mode: AggregationMode,
) -> Vec<Relationship> {
    if let Some(existing) = edges
        .iter_mut()
        .find(|existing| is_duplicate(existing, &candidate, mode))
    {
        absorb(existing, candidate, mode);
        return edges;
    }

    if !candidate.is_generic() {
        if let Some(existing) = edges
            .iter_mut()
            .find(|existing| existing.is_generic() && shares_unordered_pair(existing, &candidate))
        {
            upgrade(existing, candidate);
            return edges;
        }
    }

    edges.push(candidate);
    edges
}

/// Locate the edge a candidate ended up in after a merge: itself when it
/// was appended, the duplicate that absorbed it, or the upgraded generic
/// edge now carrying its field mapping.
pub fn find_merged<'a>(
    edges: &'a [Relationship],
    candidate: &Relationship,
    mode: AggregationMode,
) -> Option<&'a Relationship> {
    edges
        .iter()
        .find(|r| r.id == candidate.id)
        .or_else(|| edges.iter().find(|r| is_duplicate(r, candidate, mode)))
        .or_else(|| {
            edges.iter().find(|r| {
                shares_unordered_pair(r, candidate)
                    && r.source_field == candidate.source_field
                    && r.target_field == candidate.target_field
            })
        })
}

fn is_duplicate(existing: &Relationship, candidate: &Relationship, mode: AggregationMode) -> bool {
    match mode {
        AggregationMode::FieldPair => existing.field_pair_key() == candidate.field_pair_key(),
        AggregationMode::EntityPair => existing.entity_pair_key() == candidate.entity_pair_key(),
    }
}

fn shares_unordered_pair(existing: &Relationship, candidate: &Relationship) -> bool {
    existing.unordered_pair() == candidate.unordered_pair()
}

/// Fold a duplicate candidate into the surviving edge.
///
/// First-seen label and offset win; tags and field variants union; a
/// missing test anchor is filled from the candidate.
fn absorb(existing: &mut Relationship, candidate: Relationship, mode: AggregationMode) {
    existing.tags.extend(candidate.tags.iter().cloned());
    if existing.label.is_none() {
        existing.label = candidate.label.clone();
    }
    if existing.test_anchor.is_none() {
        existing.test_anchor = candidate.test_anchor.clone();
    }

    if mode == AggregationMode::EntityPair {
        // Register the surviving edge's own mapping before folding in the
        // candidate's, so render-time lookup can find either binding.
        if existing.field_variants.is_empty() {
            if let Some(variant) = primary_variant(existing) {
                existing.field_variants.push(variant);
            }
        }
        if let Some(variant) = primary_variant(&candidate) {
            push_variant(existing, variant);
        }
        for variant in candidate.field_variants {
            push_variant(existing, variant);
        }
    }
}

/// Upgrade a generic edge in place with a resolved field mapping.
///
/// The candidate's canonical direction and cardinality are adopted; the
/// existing edge keeps its id, label, offset, and origin.
fn upgrade(existing: &mut Relationship, candidate: Relationship) {
    existing.source = candidate.source;
    existing.target = candidate.target;
    existing.cardinality = candidate.cardinality;
    existing.source_field = candidate.source_field;
    existing.target_field = candidate.target_field;
    existing.test_anchor = candidate.test_anchor;
    existing.tags.extend(candidate.tags);
}

fn primary_variant(rel: &Relationship) -> Option<FieldVariant> {
    let model = rel.test_anchor.as_ref()?.model.clone();
    Some(FieldVariant {
        model,
        source_field: rel.source_field.clone()?,
        target_field: rel.target_field.clone()?,
    })
}

fn push_variant(existing: &mut Relationship, variant: FieldVariant) {
    if !existing.field_variants.contains(&variant) {
        existing.field_variants.push(variant);
    }
}
