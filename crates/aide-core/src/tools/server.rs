use crate::errors::AgentError;
use crate::files::FileStore;
use crate::mcp::McpServer;
use crate::tools::{
    CreateFileTool, DeleteFileTool, ListFilesTool, ProjectStructureTool, ReadFileTool,
    RenameFileTool, ToolFuture, ToolMetadata, ToolRegistry, UpdateFileTool,
};
use serde_json::Value;
use std::sync::Arc;

pub const FILE_OPERATIONS_SERVER: &str = "file-operations";

/// In-process MCP server exposing the project files as tools.
pub struct FileOperationsServer {
    name: String,
    store: Arc<FileStore>,
    registry: ToolRegistry,
}

impl FileOperationsServer {
    pub fn new(store: Arc<FileStore>) -> Self {
        let mut registry = ToolRegistry::new();
        registry.register_tool(Arc::new(CreateFileTool::new(store.clone())));
        registry.register_tool(Arc::new(UpdateFileTool::new(store.clone())));
        registry.register_tool(Arc::new(DeleteFileTool::new(store.clone())));
        registry.register_tool(Arc::new(RenameFileTool::new(store.clone())));
        registry.register_tool(Arc::new(ReadFileTool::new(store.clone())));
        registry.register_tool(Arc::new(ProjectStructureTool::new(store.clone())));
        registry.register_tool(Arc::new(ListFilesTool::new(store.clone())));

        Self {
            name: FILE_OPERATIONS_SERVER.to_string(),
            store,
            registry,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn store(&self) -> &Arc<FileStore> {
        &self.store
    }

    /// Look up `tool_name` and return its pending execution.
    ///
    /// An unregistered name fails here, before any work is scheduled.
    pub fn execute_file_operation(
        &self,
        tool_name: &str,
        params: Value,
    ) -> Result<ToolFuture, AgentError> {
        self.registry.invoke(tool_name, params).map_err(|e| {
            log::warn!("{} rejected call: {}", self.name, e);
            e
        })
    }
}

impl McpServer for FileOperationsServer {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_tools(&self) -> Vec<ToolMetadata> {
        self.registry.list_tools()
    }

    fn call_tool(&self, tool: &str, params: Value) -> Result<ToolFuture, AgentError> {
        self.execute_file_operation(tool, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::MemoryBackend;
    use serde_json::json;

    fn server() -> FileOperationsServer {
        FileOperationsServer::new(Arc::new(FileStore::new(Arc::new(MemoryBackend::new()))))
    }

    #[test]
    fn test_registers_file_tools() {
        let names: Vec<String> = server().list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "create_file",
                "delete_file",
                "get_project_structure",
                "list_files",
                "read_file",
                "rename_file",
                "update_file",
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_is_synchronous_and_mutates_nothing() {
        let server = server();
        let result = server.execute_file_operation("format_disk", json!({"path": "/a.ts"}));

        assert!(matches!(result, Err(AgentError::ToolNotFound(_))));
        assert!(server.store().list_paths().await.is_empty());
    }

    #[tokio::test]
    async fn test_tool_matches_direct_store_call() {
        let via_tool = server();
        via_tool
            .execute_file_operation("create_file", json!({"path": "/a.ts", "content": "x"}))
            .unwrap()
            .await
            .unwrap();
        via_tool
            .execute_file_operation("rename_file", json!({"old_path": "/a.ts", "new_path": "/b.ts"}))
            .unwrap()
            .await
            .unwrap();

        let direct = server();
        direct.store().create_file("/a.ts", "x").await.unwrap();
        direct.store().rename_file("/a.ts", "/b.ts").await.unwrap();

        assert_eq!(via_tool.store().list_paths().await, direct.store().list_paths().await);
        assert_eq!(
            via_tool.store().read_file("/b.ts").await,
            direct.store().read_file("/b.ts").await
        );
    }

    #[tokio::test]
    async fn test_missing_required_parameter() {
        let err = server()
            .call_tool("create_file", json!({"path": "/a.ts"}))
            .unwrap()
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ToolError { .. }));
    }
}
