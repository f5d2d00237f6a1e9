//! Engine configuration
//!
//! Loaded from a TOML file named by `EXPRKIT_CONFIG`, falling back to
//! defaults when the variable is unset.
//!
//! ```toml
//! max_depth = 64
//! ```

use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "EXPRKIT_CONFIG";

const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Deepest bracket/call/operator nesting `prepare` accepts
    pub max_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text).context("Invalid engine configuration")?;
        ensure!(config.max_depth >= 1, "max_depth must be at least 1");
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("Failed to load {}", path.display()))
    }

    /// Load from `EXPRKIT_CONFIG` if set, defaults otherwise
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                tracing::info!("Loading engine config from {:?}", path);
                Self::load(path)
            }
            None => Ok(Self::default()),
        }
    }
}
