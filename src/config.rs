//! Configuration management for Parley.
//!
//! Loads configuration from ${PARLEY_HOME}/config.toml with sensible defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default config template with comments, embedded at compile time.
const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("default_config.toml");

pub mod paths {
    //! Path resolution for Parley configuration directories.
    //!
    //! PARLEY_HOME resolution order:
    //! 1. PARLEY_HOME environment variable (if set)
    //! 2. ~/.config/parley (default)

    use std::path::PathBuf;

    /// Returns the Parley home directory.
    ///
    /// Checks PARLEY_HOME env var first, falls back to ~/.config/parley
    pub fn parley_home() -> PathBuf {
        if let Ok(home) = std::env::var("PARLEY_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("parley"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        parley_home().join("config.toml")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub global: GlobalConfig,

    /// Per-agent tables, keyed by agent name.
    pub agents: BTreeMap<String, AgentConfig>,

    /// Style color overrides, keyed by style name.
    pub colors: ColorsConfig,
}

/// `[global]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Agent activated at startup.
    pub base_agent: String,
}

/// One `[agents.<name>]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// ANSI color code for this agent's streamed responses.
    pub color: Option<u8>,

    /// Inter-character delay for paced streaming; 0 streams immediately.
    pub stream_delay_ms: u64,

    pub security: SecurityConfig,
}

/// `[agents.<name>.security]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Action types that need an interactive approval prompt.
    pub approval_required_for: Vec<String>,

    /// Payloads allowed without prompting (exact or prefix-plus-space).
    pub always_allow: Vec<String>,

    /// Substrings that deny the payload outright.
    pub blocked: Vec<String>,
}

/// `[colors]` table: style name to ANSI code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColorsConfig(BTreeMap<String, u8>);

impl ColorsConfig {
    pub fn get(&self, style_name: &str) -> Option<u8> {
        self.0.get(style_name).copied()
    }
}

impl Config {
    const DEFAULT_BASE_AGENT: &str = "default";

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?;
            tracing::debug!(path = %path.display(), agents = config.agents.len(), "loaded config");
            Ok(config)
        } else {
            tracing::debug!(path = %path.display(), "config file missing, using defaults");
            Ok(Config::default())
        }
    }

    /// Returns the named agent's config, or `None` if it isn't defined.
    ///
    /// The base agent always resolves, falling back to built-in defaults
    /// when the file defines no `[agents]` tables at all.
    pub fn agent(&self, name: &str) -> Option<AgentConfig> {
        if let Some(agent) = self.agents.get(name) {
            return Some(agent.clone());
        }
        (self.agents.is_empty() && name == self.global.base_agent)
            .then(AgentConfig::default)
    }

    /// Names of all configured agents, base agent first when not listed.
    pub fn agent_names(&self) -> Vec<String> {
        if self.agents.is_empty() {
            return vec![self.global.base_agent.clone()];
        }
        self.agents.keys().cloned().collect()
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, DEFAULT_CONFIG_TEMPLATE)
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            base_agent: Config::DEFAULT_BASE_AGENT.to_string(),
        }
    }
}
