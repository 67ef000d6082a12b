//! Named, schema-described operations that agents can invoke
//!
//! A [`Tool`] declares its input schema and executes against JSON arguments.
//! The [`ToolRegistry`] validates arguments against that schema before a tool
//! runs, so tools only ever see well-formed input. Lookups resolve before any
//! async work starts: an unknown name is an immediate error, never a future
//! that fails later.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::AgentError;

pub mod file_tools;
pub mod server;

pub use file_tools::{
    CreateFileTool, DeleteFileTool, ListFilesTool, ProjectStructureTool, ReadFileTool,
    RenameFileTool, UpdateFileTool,
};
pub use server::{FileOperationsServer, FILE_OPERATIONS_SERVER};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// JSON result of a tool call: `{success, message, ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolOutput {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolOutput {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            extra: Map::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

pub type ToolFuture = BoxFuture<'static, Result<ToolOutput, AgentError>>;

// Core Tool trait that all tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    fn metadata(&self) -> ToolMetadata;
    async fn execute(&self, arguments: Value) -> Result<ToolOutput, AgentError>;
}

/// Check `arguments` against the tool's declared input schema.
pub fn validate_arguments(metadata: &ToolMetadata, arguments: &Value) -> Result<(), AgentError> {
    let schema = JSONSchema::compile(&metadata.input_schema).map_err(|e| {
        AgentError::ConfigError(format!(
            "Invalid input schema for tool '{}': {}",
            metadata.name, e
        ))
    })?;

    if let Err(errors) = schema.validate(arguments) {
        let messages: Vec<String> = errors
            .map(|error| {
                let path = if error.instance_path.to_string().is_empty() {
                    "root".to_string()
                } else {
                    error.instance_path.to_string()
                };
                format!("At '{}': {}", path, error)
            })
            .collect();
        return Err(AgentError::ToolError {
            tool_name: metadata.name.clone(),
            message: format!("Invalid arguments: {}", messages.join("; ")),
        });
    }
    Ok(())
}

// Tool registry for managing multiple tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.metadata().name.clone();
        self.tools.insert(name, tool);
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Metadata of every tool, sorted by name.
    pub fn list_tools(&self) -> Vec<ToolMetadata> {
        let mut tools: Vec<ToolMetadata> = self.tools.values().map(|tool| tool.metadata()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Resolve `name` and return the pending call.
    ///
    /// Fails with [`AgentError::ToolNotFound`] before anything runs when no
    /// tool has that name. The returned future validates the arguments and
    /// then executes the tool.
    pub fn invoke(&self, name: &str, arguments: Value) -> Result<ToolFuture, AgentError> {
        let tool = self
            .get_tool(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;

        Ok(Box::pin(async move {
            let metadata = tool.metadata();
            validate_arguments(&metadata, &arguments)?;
            log::debug!("Executing tool {}", metadata.name);
            tool.execute(arguments).await
        }))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn metadata(&self) -> ToolMetadata {
            ToolMetadata {
                name: "echo".to_string(),
                description: "Echoes its input".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"]
                }),
            }
        }

        async fn execute(&self, arguments: Value) -> Result<ToolOutput, AgentError> {
            Ok(ToolOutput::ok("echoed").with("text", arguments["text"].clone()))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register_tool(Arc::new(EchoTool));
        registry
    }

    #[tokio::test]
    async fn test_invoke_registered_tool() {
        let output = registry()
            .invoke("echo", json!({"text": "hi"}))
            .unwrap()
            .await
            .unwrap();

        assert_eq!(
            output.to_value(),
            json!({"success": true, "message": "echoed", "text": "hi"})
        );
    }

    #[test]
    fn test_unknown_tool_fails_before_running() {
        match registry().invoke("nope", json!({})) {
            Err(AgentError::ToolNotFound(name)) => assert_eq!(name, "nope"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected a lookup failure"),
        }
    }

    #[tokio::test]
    async fn test_schema_violation_is_tool_error() {
        let err = registry()
            .invoke("echo", json!({"text": 42}))
            .unwrap()
            .await
            .unwrap_err();

        match err {
            AgentError::ToolError { tool_name, message } => {
                assert_eq!(tool_name, "echo");
                assert!(message.contains("/text"), "{}", message);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_list_tools_sorted() {
        let registry = registry();
        assert_eq!(registry.tool_count(), 1);
        assert_eq!(registry.list_tools()[0].name, "echo");
    }
}
