//! # erdsync
//!
//! Keeps a user-drawn entity-relationship diagram synchronized with a
//! transformation project's declarative schema files.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Schema documents (declarative FK tests)           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [schema scanner boundary]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  RawCandidate set                        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [inference + aggregation]
//! ┌─────────────────────────────────────────────────────────┐
//! │      Canonical Relationship set (deduplicated,           │
//! │      direction-normalized, parent → child)               │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [geometry, per render pass]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Connection sides, parallel offsets, paths, labels      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sync writer boundary, on push]
//! ┌─────────────────────────────────────────────────────────┐
//! │        Schema documents (relationships written back)     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine layers (`schema`, `inference`, `aggregate`, `direction`,
//! `geometry`) are pure; all mutation happens in the [`workspace`] shell,
//! which replaces whole collections so a render pass never observes a
//! half-updated edge set.

pub mod aggregate;
pub mod config;
pub mod direction;
pub mod geometry;
pub mod graph;
pub mod inference;
pub mod model;
pub mod schema;
pub mod sync;
pub mod workspace;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::aggregate::{merge_relationship_into, AggregationMode, Aggregator};
    pub use crate::direction::{swap_direction, ColumnCatalog, ColumnRole};
    pub use crate::geometry::{
        build_edge_path, compute_connection_info, compute_label_position,
        compute_parallel_offset, ConnectionInfo, Side,
    };
    pub use crate::inference::{InferenceConfig, InferenceEngine, ModelResolver};
    pub use crate::model::{
        Cardinality, Entity, EntityId, LabelOffset, ModelBinding, Position, Relationship,
        RelationshipId, RelationshipOrigin, Size, TestAnchor,
    };
    pub use crate::schema::{ModelRef, RawCandidate, SchemaScanner};
    pub use crate::sync::{SyncPlan, SyncWriter, WriteResult};
    pub use crate::workspace::Workspace;
}

pub use model::{Cardinality, Entity, EntityId, Relationship, RelationshipId};
pub use workspace::Workspace;
