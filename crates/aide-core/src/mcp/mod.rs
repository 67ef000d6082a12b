//! Minimal message-queue protocol between agents and tool servers.
//!
//! Producers push [`McpMessage`]s onto a [`MessageQueue`]; a
//! [`MessageProcessor`] drains it one message per tick and hands each message
//! to a [`MessageHandler`]. Tool servers implement [`McpServer`] and are
//! reached by name through the [`crate::agents::AgentRegistry`].

pub mod message;
pub mod processor;

pub use message::{McpError, McpMessage, MessageKind};
pub use processor::{
    LoggingHandler, MessageHandler, MessageProcessor, MessageQueue, ToolRequestHandler,
};

use crate::errors::AgentError;
use crate::tools::{ToolFuture, ToolMetadata};
use serde_json::Value;

pub trait McpServer: Send + Sync {
    fn name(&self) -> &str;

    fn list_tools(&self) -> Vec<ToolMetadata>;

    /// Resolve `tool` and return its pending execution. Unknown tools fail
    /// here rather than in the returned future.
    fn call_tool(&self, tool: &str, params: Value) -> Result<ToolFuture, AgentError>;
}
