//! Working-copy configuration (`.tangle/config.toml`).

use crate::blob_store::DEFAULT_COMPRESSION_LEVEL;
use crate::error::{Result, TangleError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File name of the configuration inside the `.tangle` directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Key naming the external merge program.
pub const MERGE_TOOL_PROGRAM_KEY: &str = "merge/diffmerge/program";

/// Configuration for a working copy.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Blob storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Merge tool settings.
    #[serde(default)]
    pub merge: MergeConfig,
}

impl Config {
    /// Loads configuration from `tangle_dir`, or defaults when absent.
    pub fn load(tangle_dir: &Path) -> Result<Self> {
        let path = tangle_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| TangleError::ConfigError(format!("failed to read config: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| TangleError::ConfigError(format!("failed to parse config: {}", e)))
    }

    /// Saves configuration into `tangle_dir`.
    pub fn save(&self, tangle_dir: &Path) -> Result<()> {
        let path = tangle_dir.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self)
            .map_err(|e| TangleError::ConfigError(format!("failed to serialize config: {}", e)))?;
        fs::write(&path, content)
            .map_err(|e| TangleError::ConfigError(format!("failed to write config: {}", e)))?;
        Ok(())
    }

    /// Looks up a string value by slash-separated key, e.g.
    /// `merge/diffmerge/program`.
    ///
    /// Returns `None` for missing keys and for values that are not strings.
    pub fn lookup(&self, key: &str) -> Result<Option<String>> {
        let mut value = toml::Value::try_from(self)
            .map_err(|e| TangleError::ConfigError(format!("failed to serialize config: {}", e)))?;
        for part in key.split('/') {
            value = match value {
                toml::Value::Table(mut table) => match table.remove(part) {
                    Some(v) => v,
                    None => return Ok(None),
                },
                _ => return Ok(None),
            };
        }
        Ok(match value {
            toml::Value::String(s) => Some(s),
            _ => None,
        })
    }

    /// The configured merge program, ignoring blank values.
    pub fn merge_tool_program(&self) -> Result<Option<String>> {
        Ok(self
            .lookup(MERGE_TOOL_PROGRAM_KEY)?
            .filter(|program| !program.trim().is_empty()))
    }
}

/// Blob storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// zstd compression level for new blobs (1-22, default: 3).
    pub compression_level: i32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

/// Merge configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MergeConfig {
    /// The external two-way-with-ancestor merge tool.
    #[serde(default)]
    pub diffmerge: DiffMergeConfig,
}

/// External merge tool settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DiffMergeConfig {
    /// Program to launch. Unset means no tool is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
}
