//! Configuration module
//!
//! Handles loading runner configuration, environment overrides and
//! per-test scope resolution.

mod env;
mod scope;

pub use env::EnvConfig;
pub use scope::{
    resolve_skip, resolve_timeout, resolve_todo, Scope, ScopeLevel, DEFAULT_TIMEOUT_SECS,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./async-trial.yaml",
    "./async-trial.yml",
    "./.async-trial.yaml",
    "~/.config/async-trial/config.yaml",
    "~/.async-trial.yaml",
];

/// Runner configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Per-phase timeout in seconds when no scope sets one
    pub default_timeout_secs: f64,

    /// Stop the run after the first failing test
    pub fail_fast: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Scopes shared by every test (module/package level settings)
    pub scopes: Vec<Scope>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            fail_fast: false,
            log_level: "info".to_string(),
            scopes: Vec::new(),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        let config: Self = if is_yaml_file(path.as_ref()) {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        };

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = if is_yaml_file(path.as_ref()) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Resolve the effective configuration: explicit file, discovered
    /// file or defaults, then environment overrides
    pub fn resolve(explicit: Option<&Path>, env: &EnvConfig) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env.config_file.as_ref().map(PathBuf::from))
            .or_else(Self::find);

        let config = match path {
            Some(path) => Self::load(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => Self::default(),
        };

        Ok(config.with_env(env))
    }

    /// Apply environment overrides
    pub fn with_env(mut self, env: &EnvConfig) -> Self {
        if let Some(timeout) = env.timeout {
            self.default_timeout_secs = timeout;
        }
        if let Some(fail_fast) = env.fail_fast {
            self.fail_fast = fail_fast;
        }
        if let Some(level) = &env.log_level {
            self.log_level = level.clone();
        }
        self
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}
