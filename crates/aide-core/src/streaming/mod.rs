//! Real-time code generation over a streaming LLM response.
//!
//! [`StreamingCodeGenerator`] runs one streaming session at a time: it decodes
//! server-sent events, forwards text deltas to a [`StreamObserver`], picks file
//! blocks out of the text with [`OperationParser`] and writes them to the
//! [`crate::files::FileStore`].

pub mod generator;
pub mod parser;
pub mod sse;

pub use generator::{GenerationOutcome, StreamingCodeGenerator, DEFAULT_SYSTEM_PROMPT};
pub use parser::{OperationParser, ParsedBlock};
pub use sse::{SseDecoder, SseFrame};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
}

/// A file block the model finished writing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileOperation {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Idle,
    Streaming,
    Complete,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamProgress {
    pub tokens_received: usize,
    #[serde(rename = "responseTime")]
    pub response_time_ms: u64,
    pub status: StreamStatus,
}

/// Receives live updates from a generation session.
///
/// Calls happen on the task driving the stream, in arrival order. All methods
/// default to doing nothing.
pub trait StreamObserver: Send + Sync {
    fn on_token(&self, _token: &str) {}

    fn on_file_operation(&self, _operation: &FileOperation) {}

    fn on_progress(&self, _progress: &StreamProgress) {}
}
