//! Core of a browser-based AI IDE: streaming code generation into a persisted
//! virtual filesystem.
//!
//! # Architecture Overview
//!
//! - **Files**: a cached [`files::FileStore`] over a remote row store, with a
//!   directory tree rebuilt on demand
//! - **Tools**: file operations exposed as schema-described tools through the
//!   [`tools::FileOperationsServer`]
//! - **Messaging**: a polled queue of MCP messages with per-message fault
//!   isolation ([`mcp::MessageProcessor`])
//! - **Agents**: descriptors, capability routing and change events
//!   ([`agents::AgentRegistry`])
//! - **Streaming**: the [`streaming::StreamingCodeGenerator`], which reads an
//!   LLM token stream and applies the file blocks it contains as they complete
//!
//! [`AideFactory`] wires all of these from an [`AideConfig`].

pub mod agents;
pub mod config;
pub mod errors;
pub mod factory;
pub mod files;
pub mod llm;
pub mod mcp;
pub mod streaming;
pub mod tools;

pub use agents::{AgentDescriptor, AgentRegistry, AgentStatus, AgentType};
pub use config::*;
pub use errors::AgentError;
pub use factory::{Aide, AideFactory};
pub use files::{FileRecord, FileStore, FileSystemNode};
pub use llm::{OpenAIStreamClient, StreamingLLM};
pub use streaming::{
    FileOperation, GenerationOutcome, StreamObserver, StreamProgress, StreamStatus,
    StreamingCodeGenerator,
};
pub use tools::FileOperationsServer;

#[cfg(test)]
pub mod test_utils;
