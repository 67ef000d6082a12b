//! Language model provider abstraction for streaming chat completions.
//!
//! The generator only needs a raw byte stream of server-sent events; decoding
//! happens in [`crate::streaming`]. Providers differ in URL and auth, not in
//! the frame format.

use crate::errors::AgentError;
use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

pub mod openai;

pub use openai::OpenAIStreamClient;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Response body chunks exactly as they came off the wire.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, AgentError>> + Send>>;

#[async_trait]
pub trait StreamingLLM: Send + Sync {
    /// Start a streaming completion and hand back its body once the response
    /// headers arrived with a success status.
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> Result<ByteStream, AgentError>;

    /// Reject a client that could never open a stream, such as one without
    /// credentials. Called before any other work for a session.
    fn validate(&self) -> Result<(), AgentError> {
        Ok(())
    }

    fn model(&self) -> &str;
}
