//! Direction normalization: the parent → child labeling convention.
//!
//! Inferred edges are directed correctly by construction (the referenced
//! model is the parent). User-drawn edges are classified here: when both
//! endpoints are bound and catalog metadata is available, the primary-key
//! side becomes the parent; otherwise the literal draw direction stands.
//! The manual swap is a pure transform and its own inverse.

use std::collections::{HashMap, HashSet};

use crate::model::{Cardinality, Relationship};

// ============================================================================
// Column classification
// ============================================================================

/// Best-effort key classification of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnRole {
    /// Primary-key-like: unique identifier of its own model.
    PrimaryKey,
    /// Foreign-key-like: references another model's key.
    ForeignKey,
    /// No catalog metadata available.
    #[default]
    Unknown,
}

/// Catalog metadata lookup used only by direction normalization.
///
/// The exact classification heuristic is a policy behind this trait, not
/// a fixed algorithm; implementations return `Unknown` freely.
pub trait ColumnCatalog {
    fn column_role(&self, model: &str, column: &str) -> ColumnRole;
}

/// Catalog over explicitly recorded key columns.
#[derive(Debug, Default)]
pub struct BindingCatalog {
    primary_keys: HashMap<String, HashSet<String>>,
    foreign_keys: HashMap<String, HashSet<String>>,
}

impl BindingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_primary_key(&mut self, model: impl Into<String>, column: impl Into<String>) {
        self.primary_keys
            .entry(model.into())
            .or_default()
            .insert(column.into());
    }

    pub fn record_foreign_key(&mut self, model: impl Into<String>, column: impl Into<String>) {
        self.foreign_keys
            .entry(model.into())
            .or_default()
            .insert(column.into());
    }
}

impl ColumnCatalog for BindingCatalog {
    fn column_role(&self, model: &str, column: &str) -> ColumnRole {
        if self
            .primary_keys
            .get(model)
            .is_some_and(|cols| cols.contains(column))
        {
            ColumnRole::PrimaryKey
        } else if self
            .foreign_keys
            .get(model)
            .is_some_and(|cols| cols.contains(column))
        {
            ColumnRole::ForeignKey
        } else {
            ColumnRole::Unknown
        }
    }
}

/// A catalog with no metadata; every lookup is `Unknown`.
#[derive(Debug, Default)]
pub struct EmptyCatalog;

impl ColumnCatalog for EmptyCatalog {
    fn column_role(&self, _model: &str, _column: &str) -> ColumnRole {
        ColumnRole::Unknown
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Normalize a user-drawn edge's direction.
///
/// `source_model`/`target_model` are the active bindings of the drawn
/// endpoints (`None` for an unbound, greenfield entity). The draw
/// direction is kept unless the source endpoint classifies as
/// foreign-key-like and the target as primary-key-like, in which case the
/// edge flips so the key-holding entity becomes the parent. Cardinality
/// is set to `OneToMany` in every outcome.
pub fn normalize_drawn(
    edge: Relationship,
    source_model: Option<&str>,
    target_model: Option<&str>,
    catalog: &dyn ColumnCatalog,
) -> Relationship {
    let roles = classify(&edge, source_model, target_model, catalog);
    let mut edge = match roles {
        Some((ColumnRole::ForeignKey, ColumnRole::PrimaryKey)) => swap_direction(&edge),
        _ => edge,
    };
    edge.cardinality = Cardinality::OneToMany;
    edge
}

fn classify(
    edge: &Relationship,
    source_model: Option<&str>,
    target_model: Option<&str>,
    catalog: &dyn ColumnCatalog,
) -> Option<(ColumnRole, ColumnRole)> {
    let source_model = source_model?;
    let target_model = target_model?;
    let source_field = edge.source_field.as_deref()?;
    let target_field = edge.target_field.as_deref()?;

    let source_role = catalog.column_role(source_model, source_field);
    let target_role = catalog.column_role(target_model, target_field);
    match (source_role, target_role) {
        // Only an unambiguous FK → PK or PK → FK reading counts.
        (ColumnRole::ForeignKey, ColumnRole::PrimaryKey)
        | (ColumnRole::PrimaryKey, ColumnRole::ForeignKey) => Some((source_role, target_role)),
        _ => None,
    }
}

// ============================================================================
// Swap
// ============================================================================

/// Exchange the parent/child roles of an edge.
///
/// Swaps endpoints and fields, toggles `OneToMany` ↔ `ManyToOne`, and
/// leaves `OneToOne`/`ManyToMany` values intact while reversing which
/// endpoint is semantically primary. Self-inverse: `swap(swap(e)) == e`.
/// The test anchor is left untouched here — relocating it to the new
/// child side requires binding knowledge the edge does not carry, so the
/// workspace shell queues the stale anchor and re-resolves the new one.
pub fn swap_direction(edge: &Relationship) -> Relationship {
    let mut out = edge.clone();
    std::mem::swap(&mut out.source, &mut out.target);
    std::mem::swap(&mut out.source_field, &mut out.target_field);
    out.cardinality = edge.cardinality.reverse();
    for variant in &mut out.field_variants {
        std::mem::swap(&mut variant.source_field, &mut variant.target_field);
    }
    out
}

// ============================================================================
// Labels
// ============================================================================

/// Render the parent → child label convention:
/// `"{source_name} {verb} {target_name}"`.
///
/// A user-set label wins over the cardinality verb.
pub fn edge_label(edge: &Relationship, source_name: &str, target_name: &str) -> String {
    match &edge.label {
        Some(label) => label.clone(),
        None => format!(
            "{} {} {}",
            source_name,
            edge.cardinality.default_verb(),
            target_name
        ),
    }
}
