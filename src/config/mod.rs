//! TOML-based configuration for erdsync.
//!
//! Supports a config file (erdsync.toml) with environment variable
//! expansion.
//!
//! Example configuration:
//! ```toml
//! [project]
//! schema_paths = ["models", "${EXTRA_MODELS_DIR}"]
//! diagram_file = "erd.json"
//! sync_file = "relationships.sync.json"
//!
//! [inference]
//! default_cardinality = "one_to_many"
//! create_missing_entities = false
//!
//! [aggregation]
//! mode = "field_pair"
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregationMode;
use crate::inference::InferenceConfig;
use crate::model::Cardinality;

static ENV_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env pattern is valid"));

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub project: ProjectSettings,
    pub inference: InferenceSettings,
    pub aggregation: AggregationSettings,
}

/// Locations of the scanned project and the editor's own files.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectSettings {
    /// Roots to scan for schema documents.
    pub schema_paths: Vec<PathBuf>,
    /// Diagram record file (entities + relationships).
    pub diagram_file: PathBuf,
    /// Destination of the push batch.
    pub sync_file: PathBuf,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            schema_paths: vec![PathBuf::from("models")],
            diagram_file: PathBuf::from("erd.json"),
            sync_file: PathBuf::from("relationships.sync.json"),
        }
    }
}

/// Inference engine options.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InferenceSettings {
    pub default_cardinality: Cardinality,
    pub create_missing_entities: bool,
    pub keep_tags: bool,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            default_cardinality: Cardinality::OneToMany,
            create_missing_entities: false,
            keep_tags: true,
        }
    }
}

/// Aggregation options.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AggregationSettings {
    pub mode: AggregationMode,
}

impl Settings {
    /// Load settings from a specific file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let expanded = expand_env_vars(&content)?;
        Ok(toml::from_str(&expanded)?)
    }

    /// Discover settings: `./erdsync.toml`, then `~/.erdsync.toml`, then
    /// defaults.
    pub fn discover() -> Result<Self, SettingsError> {
        let local = PathBuf::from("erdsync.toml");
        if local.exists() {
            return Self::load(&local);
        }
        if let Some(home) = dirs::home_dir() {
            let user = home.join(".erdsync.toml");
            if user.exists() {
                return Self::load(&user);
            }
        }
        Ok(Self::default())
    }

    /// Inference config derived from these settings.
    pub fn inference_config(&self) -> InferenceConfig {
        InferenceConfig {
            default_cardinality: self.inference.default_cardinality,
            create_missing_entities: self.inference.create_missing_entities,
            keep_tags: self.inference.keep_tags,
        }
    }
}

/// Expand `${VAR}` references against the process environment.
fn expand_env_vars(content: &str) -> Result<String, SettingsError> {
    let mut missing: Option<String> = None;
    let expanded = ENV_VAR.replace_all(content, |caps: &regex::Captures| {
        let name = &caps[1];
        match env::var(name) {
            Ok(value) => value,
            Err(_) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(name) => Err(SettingsError::MissingEnvVar(name)),
        None => Ok(expanded.into_owned()),
    }
}
