//! Declarative test definitions and model references.
//!
//! Schema documents express foreign keys as relationship tests attached to
//! a column of the child model. The scanner boundary delivers those tests
//! as loosely-structured values; this module normalizes them into
//! [`RawCandidate`] records and parses model references (`ref('x')`,
//! versioned names) into [`ModelRef`].

mod scanner;

pub use scanner::JsonSchemaScanner;

use std::collections::BTreeSet;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Cardinality;

/// `ref('model')` or `ref('package', 'model')`, single or double quotes.
static REF_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^ref\(\s*(?:'(?P<a>[^']+)'|"(?P<b>[^"]+)")\s*(?:,\s*(?:'(?P<c>[^']+)'|"(?P<d>[^"]+)")\s*)?\)$"#,
    )
    .expect("ref pattern is valid")
});

/// Trailing version suffix on a model name (`orders.v2`).
static VERSION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.v(\d+)$").expect("version pattern is valid"));

// ============================================================================
// Errors
// ============================================================================

/// Errors at the schema-document boundary.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to scan schema documents: {0}")]
    Scan(String),

    #[error("Schema document not found: {0}")]
    DocumentNotFound(PathBuf),

    #[error("Failed to parse schema document {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

// ============================================================================
// Scanner boundary
// ============================================================================

/// One relationship test as found in a schema document: the model and
/// column it is attached to, plus its loose configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedTest {
    /// Model carrying the test (the foreign-key side).
    pub model: String,
    /// Column the test is attached to (the local foreign-key column).
    pub column: String,
    /// Raw test configuration (`to`/`field` at the top level or under an
    /// `arguments` block, optional `tags` and `cardinality`).
    pub config: Value,
}

impl ScannedTest {
    pub fn new(model: impl Into<String>, column: impl Into<String>, config: Value) -> Self {
        Self {
            model: model.into(),
            column: column.into(),
            config,
        }
    }
}

/// Read-only scan over a transformation project's schema documents.
///
/// Format and location rules live behind this trait; the engine only sees
/// the scanned tests.
pub trait SchemaScanner {
    fn scan(&self, paths: &[PathBuf]) -> Result<Vec<ScannedTest>, SchemaError>;
}

// ============================================================================
// Model references
// ============================================================================

/// A reference to a physical model, possibly packaged and/or versioned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRef {
    /// Package qualifier from a two-argument `ref`.
    pub package: Option<String>,
    /// Model name as written, version suffix included.
    pub name: String,
}

impl ModelRef {
    /// A bare model name.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            package: None,
            name: name.into(),
        }
    }

    /// Parse a reference expression: `ref('x')`, `ref('pkg', 'x')`, or a
    /// bare (possibly versioned) model name.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(caps) = REF_PATTERN.captures(raw) {
            let first = caps
                .name("a")
                .or_else(|| caps.name("b"))
                .map(|m| m.as_str().to_string());
            let second = caps
                .name("c")
                .or_else(|| caps.name("d"))
                .map(|m| m.as_str().to_string());
            match (first, second) {
                (Some(package), Some(name)) => Self {
                    package: Some(package),
                    name,
                },
                (Some(name), None) => Self {
                    package: None,
                    name,
                },
                _ => Self::plain(raw),
            }
        } else {
            Self::plain(raw)
        }
    }

    /// Model name with any version suffix stripped (`orders.v2` → `orders`).
    pub fn base_name(&self) -> &str {
        match VERSION_SUFFIX.find(&self.name) {
            Some(m) => &self.name[..m.start()],
            None => &self.name,
        }
    }

    /// Version number, if the name carries a suffix.
    pub fn version(&self) -> Option<u32> {
        VERSION_SUFFIX
            .captures(&self.name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.package {
            Some(pkg) => write!(f, "{}.{}", pkg, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

// ============================================================================
// Raw candidates
// ============================================================================

/// A normalized relationship candidate, before entity resolution.
///
/// Transient: discarded after mapping to a canonical `Relationship`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    /// Model carrying the foreign key (the child side).
    pub from_model: ModelRef,
    /// Referenced model (the parent side).
    pub to_model: ModelRef,
    /// Local foreign-key column on the child.
    pub from_column: String,
    /// Referenced key on the parent.
    pub to_column: String,
    /// Tags carried from the test definition.
    pub tags: BTreeSet<String>,
    /// Explicit cardinality from test metadata, if stated.
    pub cardinality: Option<Cardinality>,
}

impl RawCandidate {
    /// Normalize one scanned test into a candidate.
    ///
    /// Recognizes `to`/`field` both at the top level and nested under an
    /// `arguments` block; the two forms normalize identically. Returns
    /// `None` for a malformed definition (either key missing or blank in
    /// both places) so the caller can skip it without aborting the scan.
    pub fn from_scanned(test: &ScannedTest) -> Option<Self> {
        let to = config_str(&test.config, "to")?;
        let field = config_str(&test.config, "field")?;
        if test.model.trim().is_empty() || test.column.trim().is_empty() {
            return None;
        }

        let tags = config_lookup(&test.config, "tags")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let cardinality =
            config_str(&test.config, "cardinality").and_then(|hint| Cardinality::parse_hint(&hint));

        Some(Self {
            from_model: ModelRef::plain(&test.model),
            to_model: ModelRef::parse(&to),
            from_column: test.column.clone(),
            to_column: field,
            tags,
            cardinality,
        })
    }
}

/// Look up a config key at the top level, then under `arguments`.
fn config_lookup<'a>(config: &'a Value, key: &str) -> Option<&'a Value> {
    config
        .get(key)
        .or_else(|| config.get("arguments").and_then(|args| args.get(key)))
}

/// As `config_lookup`, but requiring a non-blank string value.
fn config_str(config: &Value, key: &str) -> Option<String> {
    let value = config_lookup(config, key)?.as_str()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
