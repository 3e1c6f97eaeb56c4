//! JSON schema-document scanner.
//!
//! Walks the configured roots for `.json` schema documents and collects
//! every relationship test attached to a model column. Document shape:
//!
//! ```json
//! {
//!   "models": [
//!     {
//!       "name": "orders",
//!       "columns": [
//!         {
//!           "name": "customer_id",
//!           "tests": [
//!             { "relationships": { "to": "ref('customers')", "field": "id" } }
//!           ]
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use super::{ScannedTest, SchemaError, SchemaScanner};

/// Scanner over JSON schema documents on disk.
#[derive(Debug, Default)]
pub struct JsonSchemaScanner;

impl JsonSchemaScanner {
    pub fn new() -> Self {
        Self
    }
}

impl SchemaScanner for JsonSchemaScanner {
    fn scan(&self, paths: &[PathBuf]) -> Result<Vec<ScannedTest>, SchemaError> {
        let mut tests = Vec::new();
        for path in paths {
            collect_path(path, &mut tests)?;
        }
        Ok(tests)
    }
}

fn collect_path(path: &Path, out: &mut Vec<ScannedTest>) -> Result<(), SchemaError> {
    if !path.exists() {
        return Err(SchemaError::DocumentNotFound(path.to_path_buf()));
    }
    if path.is_dir() {
        let entries = fs::read_dir(path).map_err(|e| SchemaError::Scan(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| SchemaError::Scan(e.to_string()))?;
            let child = entry.path();
            if child.is_dir() || child.extension().is_some_and(|ext| ext == "json") {
                collect_path(&child, out)?;
            }
        }
        return Ok(());
    }

    let body = fs::read_to_string(path).map_err(|e| SchemaError::Scan(e.to_string()))?;
    let document: Value = serde_json::from_str(&body).map_err(|e| SchemaError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    collect_document(&document, out);
    Ok(())
}

fn collect_document(document: &Value, out: &mut Vec<ScannedTest>) {
    let Some(models) = document.get("models").and_then(Value::as_array) else {
        return;
    };
    for model in models {
        let Some(model_name) = model.get("name").and_then(Value::as_str) else {
            debug!("schema document model without a name, skipped");
            continue;
        };
        let Some(columns) = model.get("columns").and_then(Value::as_array) else {
            continue;
        };
        for column in columns {
            let Some(column_name) = column.get("name").and_then(Value::as_str) else {
                continue;
            };
            let Some(tests) = column.get("tests").and_then(Value::as_array) else {
                continue;
            };
            for test in tests {
                // Non-relationship tests (e.g. "not_null" strings) are
                // someone else's concern.
                if let Some(config) = test.get("relationships") {
                    out.push(ScannedTest::new(model_name, column_name, config.clone()));
                }
            }
        }
    }
}
