//! Write-back boundary: canonical relationships → schema documents.
//!
//! A push builds one [`SyncPlan`] — test upserts for every anchored edge
//! plus removals for anchors made stale by swaps — and hands it to the
//! [`SyncWriter`] as a single atomic batch. The in-memory model is never
//! touched on failure, so a failed push leaves both the edge set and the
//! pending-removal queue unchanged.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Cardinality, Node, Relationship, TestAnchor};
use crate::schema::SchemaError;

/// Errors surfaced by the boundary operations.
///
/// These are the only user-visible failures; they report how many
/// relationships were affected, and the caller guarantees no partial
/// apply happened.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("schema scan failed, {affected} relationships left unchanged: {source}")]
    Scan {
        affected: usize,
        #[source]
        source: SchemaError,
    },

    #[error("write-back failed, {affected} relationships not persisted: {message}")]
    Write { affected: usize, message: String },
}

/// One declarative test to create or update at its anchor location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestUpsert {
    /// Child model and foreign-key column the test attaches to.
    pub anchor: TestAnchor,
    /// Referenced (parent) model.
    pub to_model: String,
    /// Referenced key on the parent.
    pub to_field: String,
    pub cardinality: Cardinality,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

/// The batch handed to the writer on push.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncPlan {
    pub upserts: Vec<TestUpsert>,
    /// Stale anchors whose test entries must be removed (post-swap
    /// relocation); removal, not just addition at the new location.
    pub removals: Vec<TestAnchor>,
}

impl SyncPlan {
    /// Build the plan for the current edge set.
    ///
    /// Only anchored, field-carrying relationships produce upserts; the
    /// parent side is named by the source entity's active binding (its id
    /// when unbound). Pending removals that collide with a current upsert
    /// anchor are dropped — that location is being rewritten, not
    /// abandoned.
    pub fn build(
        nodes: &[Node],
        relationships: &[Relationship],
        pending_removals: &[TestAnchor],
    ) -> Self {
        let mut upserts = Vec::new();
        for rel in relationships {
            let Some(anchor) = rel.test_anchor.clone() else {
                continue;
            };
            let (Some(to_field), Some(_)) = (rel.source_field.clone(), rel.target_field.as_ref())
            else {
                debug!(id = %rel.id, "anchored relationship without field pair, not synced");
                continue;
            };
            let to_model = nodes
                .iter()
                .filter_map(Node::as_entity)
                .find(|e| e.id == rel.source)
                .and_then(|e| e.active_binding().map(|b| b.model.clone()))
                .unwrap_or_else(|| rel.source.as_str().to_string());

            upserts.push(TestUpsert {
                anchor,
                to_model,
                to_field,
                cardinality: rel.cardinality,
                tags: rel.tags.clone(),
            });
        }

        let removals = pending_removals
            .iter()
            .filter(|anchor| !upserts.iter().any(|u| &u.anchor == *anchor))
            .cloned()
            .collect();

        Self { upserts, removals }
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removals.is_empty()
    }

    /// Number of records this plan touches.
    pub fn affected(&self) -> usize {
        self.upserts.len() + self.removals.len()
    }
}

/// Outcome of a successful write-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    pub written: usize,
    pub removed: usize,
}

/// Persists a sync plan into the project's schema documents.
///
/// Implementations must apply the whole plan as one batch: either every
/// record lands or none do.
pub trait SyncWriter {
    fn write(&mut self, plan: &SyncPlan) -> Result<WriteResult, SyncError>;
}

/// Writer that serializes the batch to a JSON file, atomically via a
/// temp-file rename.
#[derive(Debug)]
pub struct FileSyncWriter {
    path: PathBuf,
}

impl FileSyncWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SyncWriter for FileSyncWriter {
    fn write(&mut self, plan: &SyncPlan) -> Result<WriteResult, SyncError> {
        let io_err = |e: String| SyncError::Write {
            affected: plan.affected(),
            message: e,
        };

        let body = serde_json::to_string_pretty(plan).map_err(|e| io_err(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, body).map_err(|e| io_err(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| io_err(e.to_string()))?;

        Ok(WriteResult {
            written: plan.upserts.len(),
            removed: plan.removals.len(),
        })
    }
}
