//! Tools over the project [`FileStore`]
//!
//! Each tool wraps one store operation. A backend that rejects a mutation is
//! reported as `success: false` rather than an error, so a calling agent sees
//! the failure as data. Invalid paths are errors.

use crate::errors::AgentError;
use crate::files::FileStore;
use crate::tools::{Tool, ToolMetadata, ToolOutput};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

fn string_arg<'a>(tool: &str, arguments: &'a Value, key: &str) -> Result<&'a str, AgentError> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AgentError::ToolError {
            tool_name: tool.to_string(),
            message: format!("Missing or invalid '{}' parameter", key),
        })
}

/// Map a store result onto a tool result.
fn report<T>(
    result: Result<T, AgentError>,
    on_success: impl FnOnce(T) -> ToolOutput,
) -> Result<ToolOutput, AgentError> {
    match result {
        Ok(value) => Ok(on_success(value)),
        Err(AgentError::PersistenceError(message)) => Ok(ToolOutput::failed(message)),
        Err(e) => Err(e),
    }
}

fn path_and_content_schema(path_description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": { "type": "string", "description": path_description },
            "content": { "type": "string", "description": "Complete file content" }
        },
        "required": ["path", "content"]
    })
}

fn path_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": { "type": "string", "description": description }
        },
        "required": ["path"]
    })
}

pub struct CreateFileTool {
    store: Arc<FileStore>,
}

impl CreateFileTool {
    pub fn new(store: Arc<FileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateFileTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "create_file".to_string(),
            description: "Create a file in the project, replacing it if it already exists".to_string(),
            input_schema: path_and_content_schema("Project path of the new file, e.g. /src/App.tsx"),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, AgentError> {
        let path = string_arg("create_file", &arguments, "path")?;
        let content = string_arg("create_file", &arguments, "content")?;

        report(self.store.create_file(path, content).await, |record| {
            ToolOutput::ok(format!("Created {}", record.path))
                .with("path", record.path)
                .with("file_type", json!(record.file_type))
        })
    }
}

pub struct UpdateFileTool {
    store: Arc<FileStore>,
}

impl UpdateFileTool {
    pub fn new(store: Arc<FileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateFileTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "update_file".to_string(),
            description: "Replace the content of a project file".to_string(),
            input_schema: path_and_content_schema("Project path of the file to update"),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, AgentError> {
        let path = string_arg("update_file", &arguments, "path")?;
        let content = string_arg("update_file", &arguments, "content")?;

        report(self.store.update_file(path, content).await, |record| {
            ToolOutput::ok(format!("Updated {}", record.path)).with("path", record.path)
        })
    }
}

pub struct DeleteFileTool {
    store: Arc<FileStore>,
}

impl DeleteFileTool {
    pub fn new(store: Arc<FileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "delete_file".to_string(),
            description: "Delete a project file. Deleting a missing file succeeds".to_string(),
            input_schema: path_schema("Project path of the file to delete"),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, AgentError> {
        let path = string_arg("delete_file", &arguments, "path")?;

        report(self.store.delete_file(path).await, |_| {
            ToolOutput::ok(format!("Deleted {}", path))
        })
    }
}

pub struct RenameFileTool {
    store: Arc<FileStore>,
}

impl RenameFileTool {
    pub fn new(store: Arc<FileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RenameFileTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "rename_file".to_string(),
            description: "Move a project file to a new path".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "old_path": { "type": "string", "description": "Current path" },
                    "new_path": { "type": "string", "description": "Destination path" }
                },
                "required": ["old_path", "new_path"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, AgentError> {
        let old_path = string_arg("rename_file", &arguments, "old_path")?;
        let new_path = string_arg("rename_file", &arguments, "new_path")?;

        report(self.store.rename_file(old_path, new_path).await, |moved| {
            if moved {
                ToolOutput::ok(format!("Renamed {} to {}", old_path, new_path))
            } else {
                ToolOutput::failed(format!(
                    "{} has not been loaded in this session; read it before renaming",
                    old_path
                ))
            }
        })
    }
}

pub struct ReadFileTool {
    store: Arc<FileStore>,
}

impl ReadFileTool {
    pub fn new(store: Arc<FileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "read_file".to_string(),
            description: "Read the content of a project file".to_string(),
            input_schema: path_schema("Project path of the file to read"),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, AgentError> {
        let path = string_arg("read_file", &arguments, "path")?;

        Ok(match self.store.read_file(path).await {
            Some(content) => ToolOutput::ok(format!("Read {}", path)).with("content", content),
            None => ToolOutput::failed(format!("File not found: {}", path)),
        })
    }
}

pub struct ProjectStructureTool {
    store: Arc<FileStore>,
}

impl ProjectStructureTool {
    pub fn new(store: Arc<FileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ProjectStructureTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "get_project_structure".to_string(),
            description: "Directory tree of every file in the project".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn execute(&self, _arguments: Value) -> Result<ToolOutput, AgentError> {
        let tree = self.store.get_project_structure().await;
        let files: usize = tree.iter().map(|node| node.file_paths().len()).sum();
        Ok(ToolOutput::ok(format!("{} files", files)).with("tree", serde_json::to_value(&tree)?))
    }
}

pub struct ListFilesTool {
    store: Arc<FileStore>,
}

impl ListFilesTool {
    pub fn new(store: Arc<FileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "list_files".to_string(),
            description: "Sorted list of every file path in the project".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn execute(&self, _arguments: Value) -> Result<ToolOutput, AgentError> {
        let paths = self.store.list_paths().await;
        Ok(ToolOutput::ok(format!("{} files", paths.len())).with("paths", paths))
    }
}
