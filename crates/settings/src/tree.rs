//! Hierarchical property tree backed by a JSON document.
//!
//! Keys are dotted paths ("Pipelines.nominal.JetID"). Global settings
//! sit at the root, per-pipeline settings under `Pipelines.<name>`.

use crate::error::Result;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Root key holding one object per pipeline.
pub const PIPELINES_KEY: &str = "Pipelines";

/// Read-only configuration tree, loaded once before any pipeline runs.
#[derive(Debug, Clone)]
pub struct PropertyTree {
    root: Value,
}

impl PropertyTree {
    /// Wrap an already parsed JSON document.
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Parse a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(Self::from_value(serde_json::from_str(content)?))
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        tracing::debug!("Loaded configuration from {:?}", path);
        Self::from_json_str(&content)
    }

    /// Walk a dotted path. Returns `None` if any segment is missing
    /// or an intermediate node is not an object.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.root, |node, segment| node.as_object()?.get(segment))
    }

    /// Names of all configured pipelines, in key order.
    pub fn pipeline_names(&self) -> Vec<String> {
        self.root
            .get(PIPELINES_KEY)
            .and_then(Value::as_object)
            .map(|pipelines| pipelines.keys().cloned().collect())
            .unwrap_or_default()
    }
}
