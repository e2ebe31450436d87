//! Configuration helpers shared by Surge binaries.
//!
//! Configuration lives in `~/.surge/config.json`. An explicit file passed on
//! the command line is deep-merged over it, so a partial file only needs the
//! keys it changes.
//!
//! # Configuration Priority
//!
//! 1. Command line flags
//! 2. Environment variables (`SURGE_*` prefix)
//! 3. Explicit config file (`--config`)
//! 4. `~/.surge/config.json`
//! 5. Default values

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".surge"),
        |dirs| dirs.home_dir().join(".surge"),
    )
}

/// Get the default configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Expand `~` and environment variables in a configured path.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::full(raw).map_or_else(|_| raw.to_string(), |p| p.into_owned()))
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets pinned to `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// ============================================================================
// Layered JSON Loading
// ============================================================================

/// Load a JSON file and return its contents as a Value.
/// Returns None if the file doesn't exist.
pub fn load_json_file(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(Some(value))
}

/// Deep merge two JSON values.
/// Source values override target values, with object merging at each level.
pub fn merge_json(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, source_value) in source_map {
                match target_map.get_mut(&key) {
                    Some(target_value) => merge_json(target_value, source_value),
                    None => {
                        target_map.insert(key, source_value);
                    }
                }
            }
        }
        (target, source) => {
            *target = source;
        }
    }
}

/// Load the default config file and merge an optional explicit file over it.
///
/// An explicit file that does not exist is an error; a missing default file
/// is not.
pub fn load_layered(explicit: Option<&Path>) -> Result<Value> {
    let mut merged = load_json_file(&config_path())?.unwrap_or(Value::Object(Default::default()));

    if let Some(path) = explicit {
        let overlay = load_json_file(path)?
            .with_context(|| format!("Config file {} not found", path.display()))?;
        merge_json(&mut merged, overlay);
        tracing::debug!(path = %path.display(), "Merged explicit config file");
    }

    Ok(merged)
}
