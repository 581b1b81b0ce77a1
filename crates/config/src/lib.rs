//! Configuration loading, validation, and management for Kangae.
//!
//! Loads configuration from `~/.kangae/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Strategy names accepted in `[agent] strategy`.
pub const KNOWN_STRATEGIES: [&str; 3] = ["react", "cot", "tot"];

/// The root configuration structure.
///
/// Maps directly to `~/.kangae/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    /// Tree-of-Thoughts search parameters
    #[serde(default)]
    pub tot: TotConfig,

    /// External process used as the language model
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Default strategy: "react", "cot" or "tot"
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Turn budget for CoT and ReAct
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Memories recalled before the first turn
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,
}

fn default_strategy() -> String {
    "react".into()
}
fn default_max_turns() -> usize {
    5
}
fn default_recall_limit() -> usize {
    3
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            max_turns: default_max_turns(),
            recall_limit: default_recall_limit(),
        }
    }
}

/// Which memory store backs a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    /// Keyword (substring) retrieval
    #[default]
    Conversation,
    /// TF-IDF similarity retrieval
    Vector,
}

impl MemoryKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::Vector => "vector",
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MemoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conversation" => Ok(Self::Conversation),
            "vector" => Ok(Self::Vector),
            other => Err(format!(
                "unknown memory kind '{other}' (expected conversation or vector)"
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub kind: MemoryKind,

    /// JSON file the session log is loaded from and saved to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Preset search sizes for Tree-of-Thoughts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TotLevel {
    Low,
    Middle,
    High,
    Extreme,
}

impl TotLevel {
    pub const ALL: [TotLevel; 4] = [Self::Low, Self::Middle, Self::High, Self::Extreme];

    /// `(depth, breadth)` for this preset.
    pub fn params(self) -> (usize, usize) {
        match self {
            Self::Low => (2, 2),
            Self::Middle => (3, 3),
            Self::High => (4, 4),
            Self::Extreme => (5, 5),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Middle => "MIDDLE",
            Self::High => "HIGH",
            Self::Extreme => "EXTREME",
        }
    }
}

impl fmt::Display for TotLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TotLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown ToT level '{s}' (expected LOW, MIDDLE, HIGH or EXTREME)"))
    }
}

impl TryFrom<String> for TotLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TotLevel> for String {
    fn from(level: TotLevel) -> Self {
        level.name().to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotConfig {
    /// Search rounds; overrides the preset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,

    /// Frontier width; overrides the preset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breadth: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<TotLevel>,
}

/// Depth and breadth when neither preset nor explicit value is set.
pub const DEFAULT_TOT_PARAMS: (usize, usize) = (2, 2);

impl TotConfig {
    /// Effective `(depth, breadth)`: explicit values win over the preset,
    /// which wins over the defaults.
    pub fn resolved(&self) -> (usize, usize) {
        let (depth, breadth) = self.level.map_or(DEFAULT_TOT_PARAMS, TotLevel::params);
        (self.depth.unwrap_or(depth), self.breadth.unwrap_or(breadth))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Program spawned once per model call, prompt on stdin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "kangae_agent=debug"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Additional log file (plain text, no colors)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.kangae/config.toml).
    ///
    /// Environment variables override the file:
    /// - `KANGAE_STRATEGY`, `KANGAE_MODEL_COMMAND`, `KANGAE_MEMORY_FILE`
    /// - `TOT_LEVEL`, `TOT_DEPTH`, `TOT_BREADTH`
    /// - `AGENT_LOG_LEVEL`, `AGENT_LOG_FILE`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file, without environment
    /// overrides. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(strategy) = lookup("KANGAE_STRATEGY") {
            self.agent.strategy = strategy.trim().to_lowercase();
        }
        if let Some(command) = lookup("KANGAE_MODEL_COMMAND") {
            self.model.command = Some(command);
        }
        if let Some(file) = lookup("KANGAE_MEMORY_FILE") {
            self.memory.file = Some(PathBuf::from(file));
        }

        if let Some(level) = lookup("TOT_LEVEL") {
            let parsed = level.parse::<TotLevel>().map_err(|reason| ConfigError::InvalidEnv {
                var: "TOT_LEVEL",
                value: level.clone(),
                reason,
            })?;
            self.tot.level = Some(parsed);
        }
        if let Some(depth) = lookup("TOT_DEPTH") {
            self.tot.depth = Some(positive_int("TOT_DEPTH", &depth)?);
        }
        if let Some(breadth) = lookup("TOT_BREADTH") {
            self.tot.breadth = Some(positive_int("TOT_BREADTH", &breadth)?);
        }

        if let Some(level) = lookup("AGENT_LOG_LEVEL") {
            self.logging.level = Some(level);
        }
        if let Some(file) = lookup("AGENT_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".kangae")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !KNOWN_STRATEGIES.contains(&self.agent.strategy.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "agent.strategy must be one of {}, got '{}'",
                KNOWN_STRATEGIES.join(", "),
                self.agent.strategy
            )));
        }

        if self.agent.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_turns must be at least 1".into(),
            ));
        }

        if self.tot.depth == Some(0) || self.tot.breadth == Some(0) {
            return Err(ConfigError::ValidationError(
                "tot.depth and tot.breadth must be at least 1".into(),
            ));
        }

        if self.model.command.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "model.command must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `config --default`).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Render this configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }
}

fn positive_int(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ConfigError::InvalidEnv {
            var,
            value: value.to_string(),
            reason: "must be a positive integer".into(),
        }),
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid {var}={value:?}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Failed to render configuration: {0}")]
    SerializeError(String),
}
