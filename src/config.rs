use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::workflow::DEFAULT_MAX_CONCURRENCY;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

/// How plans are executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Bound for parallel groups that don't set MaxConcurrency
    #[serde(default = "default_max_concurrency")]
    pub default_max_concurrency: usize,
    /// Deadline for a whole plan
    #[serde(default = "default_execution_timeout")]
    pub execution_timeout_secs: u64,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_execution_timeout() -> u64 {
    60 * 60
}

impl WorkflowConfig {
    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_secs)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            default_max_concurrency: default_max_concurrency(),
            execution_timeout_secs: default_execution_timeout(),
        }
    }
}

/// Dry-run executor behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_completion_delay")]
    pub completion_delay_ms: u64,
    /// Stacks reported as failed
    #[serde(default)]
    pub fail_stacks: Vec<String>,
}

fn default_completion_delay() -> u64 {
    100
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            completion_delay_ms: default_completion_delay(),
            fail_stacks: Vec::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;
        Ok(config_dir.join("stack-orchestrator").join("config.toml"))
    }
}
