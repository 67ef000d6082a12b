//! Error types for the code-generation core
//!
//! A single error enum covers every failure the core can surface. Variants are
//! grouped by where the failure originates (configuration, the LLM transport,
//! persistence, tool dispatch) so hosts can decide what to show and what to
//! retry. Nothing in the core retries on its own.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("A generation stream is already active")]
    ConcurrentStream,
    #[error("Transport error: {0}")]
    TransportError(String),
    #[error("LLM interaction failed: {0}")]
    LLMError(String),
    #[error("Parsing error: {0}")]
    ParsingError(String),
    #[error("Persistence error: {0}")]
    PersistenceError(String),
    #[error("Tool execution failed for '{tool_name}': {message}")]
    ToolError { tool_name: String, message: String },
    #[error("Tool not found: {0}")]
    ToolNotFound(String),
    #[error("Unknown server: {0}")]
    UnknownServer(String),
    #[error("Agent not found: {0}")]
    AgentNotFound(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Generation cancelled")]
    Cancelled,
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        AgentError::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::TransportError(err.to_string())
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::ParsingError(err.to_string())
    }
}
