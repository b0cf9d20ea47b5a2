//! Configuration system (layered: defaults < TOML file < environment).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TurnkitError};

/// Default wall-clock budget for one turn.
pub const DEFAULT_TURN_TIMEOUT_MS: u64 = 120_000;
/// Envelopes retained per session for replay.
pub const DEFAULT_BACKLOG_CAPACITY: usize = 1000;
/// Log entries retained per session.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 20;
pub const DEFAULT_SYSTEM_PROMPT: &str = "you are a helpful assistant. if you need clarification or more information from the human, always use the 'ask_human' tool. do not just ask questions in plain text.";

const CONFIG_FILE_NAME: &str = "turnkit.toml";

/// Runtime configuration for the orchestrator and the bundled model stack.
#[derive(Clone, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Wall-clock budget for a whole turn, in milliseconds.
    #[builder(default = DEFAULT_TURN_TIMEOUT_MS)]
    pub turn_timeout_ms: u64,
    #[builder(default = DEFAULT_BACKLOG_CAPACITY)]
    pub backlog_capacity: usize,
    #[builder(default = DEFAULT_LOG_CAPACITY)]
    pub log_capacity: usize,
    /// Model used when a turn does not request one (or requests an unknown one).
    #[builder(default = crate::models::DEFAULT_MODEL_ID.to_string(), into)]
    pub default_model: String,
    #[builder(into)]
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    #[builder(default = DEFAULT_OPENAI_BASE_URL.to_string(), into)]
    pub openai_base_url: String,
    #[builder(default = DEFAULT_SYSTEM_PROMPT.to_string(), into)]
    pub system_prompt: String,
    /// Upper bound on model → tools → model cycles within one turn.
    #[builder(default = DEFAULT_MAX_TOOL_ITERATIONS)]
    pub max_tool_iterations: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("turn_timeout_ms", &self.turn_timeout_ms)
            .field("backlog_capacity", &self.backlog_capacity)
            .field("log_capacity", &self.log_capacity)
            .field("default_model", &self.default_model)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| ".."))
            .field("openai_base_url", &self.openai_base_url)
            .field("max_tool_iterations", &self.max_tool_iterations)
            .finish()
    }
}

impl RuntimeConfig {
    /// Load the full layered configuration.
    ///
    /// Reads `turnkit.toml` from the platform config directory when present,
    /// then applies environment overrides (including a `.env` file).
    pub fn load() -> Result<Self> {
        let base = match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    /// Load from an explicit TOML file, with environment overrides applied.
    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(Self::from_file(path)?.with_env_overrides())
    }

    /// Parse a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `AGENT_TURN_TIMEOUT_MS`, `TURNKIT_MODEL`, `OPENAI_API_KEY` and
    /// `OPENAI_BASE_URL` on top of `self`.
    pub fn with_env_overrides(mut self) -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error

        if let Ok(raw) = std::env::var("AGENT_TURN_TIMEOUT_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.turn_timeout_ms = ms,
                _ => tracing::warn!(value = %raw, "ignoring invalid AGENT_TURN_TIMEOUT_MS"),
            }
        }
        if let Ok(model) = std::env::var("TURNKIT_MODEL") {
            if !model.trim().is_empty() {
                self.default_model = model.trim().to_string();
            }
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                self.openai_api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            if !url.trim().is_empty() {
                self.openai_base_url = url.trim_end_matches('/').to_string();
            }
        }
        self
    }

    /// Per-turn timeout as a [`Duration`].
    pub fn turn_timeout(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_ms)
    }

    /// The OpenAI credential, or a configuration error naming what is missing.
    pub fn require_openai_api_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                TurnkitError::Configuration(
                    "OPENAI_API_KEY is not set in API process environment.".into(),
                )
            })
    }

    fn validate(&self) -> Result<()> {
        if self.turn_timeout_ms == 0 {
            return Err(TurnkitError::Configuration(
                "turn_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.backlog_capacity == 0 || self.log_capacity == 0 {
            return Err(TurnkitError::Configuration(
                "backlog_capacity and log_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Platform config location, e.g. `~/.config/turnkit/turnkit.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "turnkit", "turnkit")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RuntimeConfig::default();
        assert_eq!(config.turn_timeout_ms, 120_000);
        assert_eq!(config.backlog_capacity, 1000);
        assert_eq!(config.log_capacity, 1000);
        assert_eq!(config.default_model, "gpt-5-nano");
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn builder_overrides_fields() {
        let config = RuntimeConfig::builder()
            .turn_timeout_ms(50)
            .openai_api_key("sk-test")
            .build();
        assert_eq!(config.turn_timeout(), Duration::from_millis(50));
        assert_eq!(config.require_openai_api_key().unwrap(), "sk-test");
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let config = RuntimeConfig::default();
        let err = config.require_openai_api_key().unwrap_err();
        assert!(matches!(err, TurnkitError::Configuration(ref msg) if msg.contains("OPENAI_API_KEY")));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = RuntimeConfig::builder().openai_api_key("sk-secret").build();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
    }
}
