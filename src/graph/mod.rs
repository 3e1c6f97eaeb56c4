//! Graph view over the diagram for adjacency and parallel-edge queries.
//!
//! Built fresh from the current node/relationship collections whenever the
//! edge set is replaced; rendering asks it for each edge's index among the
//! edges sharing the same entity pair.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::model::{EntityId, Node, Relationship, RelationshipId};

/// Directed multigraph over entities, edges weighted by relationship id.
#[derive(Debug, Default)]
pub struct DiagramGraph {
    graph: DiGraph<EntityId, RelationshipId>,
    node_indices: HashMap<EntityId, NodeIndex>,
    /// relationship id → (index within its parallel group, group size)
    parallel: HashMap<RelationshipId, (usize, usize)>,
}

impl DiagramGraph {
    /// Build the graph view for the current collections.
    ///
    /// Relationships pointing at unknown entities are skipped with a
    /// diagnostic; they stay in the edge set but get no graph presence.
    pub fn build(nodes: &[Node], relationships: &[Relationship]) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for node in nodes {
            if node.as_entity().is_some() {
                let id = node.id().clone();
                let idx = graph.add_node(id.clone());
                node_indices.insert(id, idx);
            }
        }

        let mut groups: HashMap<(EntityId, EntityId), Vec<RelationshipId>> = HashMap::new();
        for rel in relationships {
            let (Some(&source), Some(&target)) = (
                node_indices.get(&rel.source),
                node_indices.get(&rel.target),
            ) else {
                debug!(id = %rel.id, "relationship endpoint missing from canvas, no graph edge");
                continue;
            };
            graph.add_edge(source, target, rel.id.clone());
            groups
                .entry(rel.unordered_pair())
                .or_default()
                .push(rel.id.clone());
        }

        let mut parallel = HashMap::new();
        for members in groups.into_values() {
            let total = members.len();
            for (index, id) in members.into_iter().enumerate() {
                parallel.insert(id, (index, total));
            }
        }

        Self {
            graph,
            node_indices,
            parallel,
        }
    }

    /// Index of this edge within its parallel group, and the group size.
    ///
    /// Unknown edges count as a group of one.
    pub fn parallel_position(&self, id: &RelationshipId) -> (usize, usize) {
        self.parallel.get(id).copied().unwrap_or((0, 1))
    }

    /// Entities adjacent to this one, in either direction.
    pub fn neighbors(&self, id: &EntityId) -> Vec<EntityId> {
        let Some(&idx) = self.node_indices.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<EntityId> = self
            .graph
            .neighbors_undirected(idx)
            .map(|n| self.graph[n].clone())
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Number of edges incident to this entity (self-edges count once).
    pub fn degree(&self, id: &EntityId) -> usize {
        let Some(&idx) = self.node_indices.get(id) else {
            return 0;
        };
        self.graph
            .edge_indices()
            .filter(|&e| {
                self.graph
                    .edge_endpoints(e)
                    .is_some_and(|(a, b)| a == idx || b == idx)
            })
            .count()
    }

    pub fn entity_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
