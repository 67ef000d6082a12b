//! Configuration for the aide runtime
//!
//! Configuration is read from YAML. Secrets may be given inline or through
//! the environment variables named by `api_key_env` / `service_key_env`.

pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;


use crate::errors::AgentError;
use std::path::Path;

/// Load a configuration from a YAML file
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<AideConfig, AgentError> {
    ConfigLoader::from_file(path).await
}
