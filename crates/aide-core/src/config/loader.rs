//! Configuration loader for YAML files and environment resolution

use crate::config::types::*;
use crate::errors::AgentError;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const DEFAULT_CONFIG_FILE: &str = "aide.yaml";

/// Configuration loader with environment resolution
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<AideConfig, AgentError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).await.map_err(|e| {
            AgentError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        log::debug!("Loaded configuration from {}", path.display());
        Self::from_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_str(content: &str) -> Result<AideConfig, AgentError> {
        let mut config: AideConfig = if content.trim().is_empty() {
            AideConfig::default()
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| AgentError::ConfigError(format!("Failed to parse YAML config: {}", e)))?
        };

        Self::resolve_environment(&mut config);
        config.validate()?;

        Ok(config)
    }

    /// The first config file that exists: `explicit`, then the per-user
    /// `aide/aide.yaml` under the platform config directory.
    pub fn discover(explicit: Option<&Path>) -> Option<PathBuf> {
        let user_file = dirs::config_dir().map(|dir| dir.join("aide").join(DEFAULT_CONFIG_FILE));

        explicit
            .map(Path::to_path_buf)
            .into_iter()
            .chain(user_file)
            .find(|candidate| candidate.is_file())
    }

    /// Load the discovered config file, or defaults when there is none.
    pub async fn load_or_default(explicit: Option<&Path>) -> Result<AideConfig, AgentError> {
        match Self::discover(explicit) {
            Some(path) => Self::from_file(path).await,
            None => {
                log::info!("No configuration file found, using defaults");
                let mut config = AideConfig::default();
                Self::resolve_environment(&mut config);
                config.validate()?;
                Ok(config)
            }
        }
    }

    fn resolve_environment(config: &mut AideConfig) {
        Self::resolve_llm_auth(&mut config.llm.auth);

        if let PersistenceBackend::Supabase {
            service_key,
            service_key_env,
            ..
        } = &mut config.persistence.backend
        {
            if service_key.is_none() {
                if let Some(var) = service_key_env.as_deref() {
                    *service_key = env::var(var).ok();
                }
            }
        }
    }

    fn resolve_llm_auth(auth: &mut LlmAuth) {
        if auth.api_key.is_some() {
            return;
        }
        if let Some(env_var) = &auth.api_key_env {
            if let Ok(api_key) = env::var(env_var) {
                auth.api_key = Some(api_key);
            }
        }
    }
}
