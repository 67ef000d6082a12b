//! Configuration types for the aide runtime
//!
//! Every section has serde defaults, so an empty YAML document is a complete
//! configuration backed by in-memory persistence.

use crate::errors::AgentError;
use crate::llm::openai::DEFAULT_API_BASE;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AideConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub parameters: ModelParameters,
    #[serde(default)]
    pub auth: LlmAuth,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base: default_api_base(),
            parameters: ModelParameters::default(),
            auth: LlmAuth::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParameters {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAuth {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
}

impl Default for LlmAuth {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
        }
    }
}

impl LlmAuth {
    /// The inline key, or the value of `api_key_env` when no key is inline.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                self.api_key_env
                    .as_deref()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|k| !k.trim().is_empty())
            })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub backend: PersistenceBackend,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PersistenceBackend {
    #[default]
    Memory,
    Supabase {
        url: String,
        #[serde(default = "default_table")]
        table: String,
        #[serde(default)]
        service_key: Option<String>,
        #[serde(default = "default_service_key_env")]
        service_key_env: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratorConfig {
    /// Replaces the built-in protocol prompt when set.
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_true")]
    pub include_project_context: bool,
    /// Report progress every this many tokens; 0 reports terminal states only.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            include_project_context: true,
            progress_interval: default_progress_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_api_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".to_string())
}

fn default_table() -> String {
    crate::files::supabase::DEFAULT_TABLE.to_string()
}

fn default_service_key_env() -> Option<String> {
    Some("SUPABASE_KEY".to_string())
}

fn default_true() -> bool {
    true
}

fn default_progress_interval() -> usize {
    10
}

fn default_tick_ms() -> u64 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AideConfig {
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.llm.model.trim().is_empty() {
            return Err(AgentError::ConfigError("LLM model cannot be empty".to_string()));
        }

        if self.llm.api_base.trim().is_empty() {
            return Err(AgentError::ConfigError("LLM api_base cannot be empty".to_string()));
        }

        let temperature = self.llm.parameters.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(AgentError::ConfigError(format!(
                "LLM temperature must be between 0 and 2, got {}",
                temperature
            )));
        }

        if self.queue.tick_ms == 0 {
            return Err(AgentError::ConfigError(
                "Queue tick_ms must be greater than 0".to_string(),
            ));
        }

        if let PersistenceBackend::Supabase { url, table, .. } = &self.persistence.backend {
            if url.trim().is_empty() {
                return Err(AgentError::ConfigError(
                    "Supabase url cannot be empty".to_string(),
                ));
            }
            if table.trim().is_empty() {
                return Err(AgentError::ConfigError(
                    "Supabase table cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}
