//! Layered configuration resolution.
//!
//! Three layers, lowest precedence first: built-in defaults, the config
//! file (optional explicit path), programmatic overrides. Layers merge as
//! JSON documents, then the result deserializes once into typed options.

use std::fs;
use std::path::Path;

use serde_json::Value;

use loam_pipeline::{RunMode, SharedPlugin};

use crate::error::{ConfigError, Result};
use crate::options::{BuildOptions, normalize_base};

/// The three user-supplied plugin buckets, in pipeline order.
///
/// Plugins are code, not data; they attach programmatically after the
/// serde layers have merged.
#[derive(Debug, Clone, Default)]
pub struct PluginBuckets {
    pub pre: Vec<SharedPlugin>,
    pub normal: Vec<SharedPlugin>,
    pub post: Vec<SharedPlugin>,
}

/// A fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub mode: RunMode,
    pub options: BuildOptions,
    pub plugins: PluginBuckets,
}

impl ResolvedConfig {
    /// Attach user plugin buckets.
    pub fn with_plugins(mut self, buckets: PluginBuckets) -> Self {
        self.plugins = buckets;
        self
    }
}

/// Resolve the full configuration for one run.
///
/// `overrides` is the programmatic layer and wins over the config file,
/// which wins over defaults. `base` is normalized here so every consumer
/// sees the canonical form. Malformed input at any layer aborts resolution
/// before any backend work happens.
pub fn resolve_config(
    overrides: Value,
    mode: RunMode,
    config_path: Option<&Path>,
) -> Result<ResolvedConfig> {
    let mut merged = serde_json::to_value(BuildOptions::default())
        .map_err(|err| ConfigError::InvalidValue(err.to_string()))?;

    if let Some(path) = config_path {
        let file_layer = load_config_file(path)?;
        merge_values(&mut merged, &file_layer);
    }

    if !overrides.is_null() {
        if !overrides.is_object() {
            return Err(ConfigError::InvalidValue(format!(
                "config overrides must be an object, got {overrides}"
            )));
        }
        merge_values(&mut merged, &overrides);
    }

    let mut options: BuildOptions = serde_json::from_value(merged)
        .map_err(|err| ConfigError::InvalidValue(err.to_string()))?;
    options.base = normalize_base(&options.base);

    tracing::debug!(mode = ?mode, entry = %options.entry, "configuration resolved");

    Ok(ResolvedConfig {
        mode,
        options,
        plugins: PluginBuckets::default(),
    })
}

fn load_config_file(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        file: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&contents).map_err(|err| ConfigError::Malformed {
        file: path.to_path_buf(),
        message: err.to_string(),
    })?;
    if !value.is_object() {
        return Err(ConfigError::Malformed {
            file: path.to_path_buf(),
            message: "expected a top-level object".to_string(),
        });
    }
    Ok(value)
}

/// Recursively merge `update` into `target`. Objects merge key-by-key;
/// arrays and scalars replace wholesale.
fn merge_values(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_values(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target_slot, _) => {
            *target_slot = update.clone();
        }
    }
}
