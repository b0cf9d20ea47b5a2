//! Error types for turnkit.

use thiserror::Error;

/// Broad error category, used to route failure handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Model,
    Timeout,
    Tool,
    Transport,
    Input,
    InvalidRequest,
    Unknown,
}

/// Primary error type for all turnkit operations.
#[derive(Error, Debug)]
pub enum TurnkitError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Agent run timed out after {timeout_ms}ms")]
    TurnTimeout { timeout_ms: u64 },

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("A human input request is already pending")]
    InputAlreadyPending,

    #[error("Human input channel closed before a reply arrived")]
    InputClosed,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl TurnkitError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a tool execution error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::ConfigFile(_) | Self::Authentication(_) => {
                ErrorCategory::Configuration
            }
            Self::Api { .. }
            | Self::Network(_)
            | Self::RateLimited { .. }
            | Self::Stream(_)
            | Self::Serialization(_) => ErrorCategory::Model,
            Self::TurnTimeout { .. } => ErrorCategory::Timeout,
            Self::ToolExecution { .. } => ErrorCategory::Tool,
            Self::Transport(_) | Self::Io(_) => ErrorCategory::Transport,
            Self::InputAlreadyPending | Self::InputClosed => ErrorCategory::Input,
            Self::InvalidArgument(_) | Self::NotFound(_) => ErrorCategory::InvalidRequest,
        }
    }

    /// Whether the failure came from the turn running past its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TurnTimeout { .. })
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TurnkitError>;
