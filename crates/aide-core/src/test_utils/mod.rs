pub mod mock_llm_server;
pub mod mock_rest_server;

use crate::errors::AgentError;
use crate::files::{FileBackend, FileRecord, MemoryBackend};
use crate::llm::{ByteStream, ChatMessage, StreamingLLM};
use crate::streaming::{FileOperation, StreamObserver, StreamProgress};
use async_trait::async_trait;
use futures::channel::mpsc::UnboundedReceiver;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// One SSE frame carrying `content` as a chat-completion delta.
pub fn chunk_frame(content: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({"choices": [{"index": 0, "delta": {"content": content}}]})
    )
}

enum Script {
    Chunks(Vec<Result<Vec<u8>, AgentError>>),
    Receiver(UnboundedReceiver<Result<Vec<u8>, AgentError>>),
    Fail(AgentError),
}

/// Scripted model: plays back one response body, then refuses further calls.
pub struct MockStreamingLLM {
    script: Mutex<Option<Script>>,
    messages: Mutex<Vec<ChatMessage>>,
}

impl MockStreamingLLM {
    fn scripted(script: Script) -> Self {
        Self {
            script: Mutex::new(Some(script)),
            messages: Mutex::new(Vec::new()),
        }
    }

    /// One frame per token, then `[DONE]`.
    pub fn with_tokens(tokens: &[&str]) -> Self {
        let mut chunks: Vec<Vec<u8>> = tokens.iter().map(|t| chunk_frame(t).into_bytes()).collect();
        chunks.push(b"data: [DONE]\n\n".to_vec());
        Self::with_chunks(chunks)
    }

    pub fn with_chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self::with_results(chunks.into_iter().map(Ok).collect())
    }

    pub fn with_results(results: Vec<Result<Vec<u8>, AgentError>>) -> Self {
        Self::scripted(Script::Chunks(results))
    }

    /// Body chunks arrive as the test sends them; the body stays open until
    /// the sender is dropped.
    pub fn with_receiver(receiver: UnboundedReceiver<Result<Vec<u8>, AgentError>>) -> Self {
        Self::scripted(Script::Receiver(receiver))
    }

    pub fn failing(error: AgentError) -> Self {
        Self::scripted(Script::Fail(error))
    }

    pub fn recorded_messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamingLLM for MockStreamingLLM {
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> Result<ByteStream, AgentError> {
        *self.messages.lock().unwrap() = messages;

        match self.script.lock().unwrap().take() {
            Some(Script::Chunks(chunks)) => Ok(Box::pin(futures::stream::iter(chunks))),
            Some(Script::Receiver(receiver)) => Ok(Box::pin(receiver)),
            Some(Script::Fail(error)) => Err(error),
            None => Err(AgentError::LLMError("Mock response already consumed".to_string())),
        }
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    tokens: Mutex<Vec<String>>,
    operations: Mutex<Vec<FileOperation>>,
    progress: Mutex<Vec<StreamProgress>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn operations(&self) -> Vec<FileOperation> {
        self.operations.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<StreamProgress> {
        self.progress.lock().unwrap().clone()
    }
}

impl StreamObserver for RecordingObserver {
    fn on_token(&self, token: &str) {
        self.tokens.lock().unwrap().push(token.to_string());
    }

    fn on_file_operation(&self, operation: &FileOperation) {
        self.operations.lock().unwrap().push(operation.clone());
    }

    fn on_progress(&self, progress: &StreamProgress) {
        self.progress.lock().unwrap().push(progress.clone());
    }
}

/// Memory backend that can be switched into rejecting every call, or only
/// its writes or deletes.
#[derive(Default)]
pub struct FailingBackend {
    inner: MemoryBackend,
    failing: AtomicBool,
    failing_upserts: AtomicBool,
    failing_deletes: AtomicBool,
    upserts: AtomicUsize,
    calls: AtomicUsize,
}

impl FailingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_upserts(&self, failing: bool) {
        self.failing_upserts.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_deletes(&self, failing: bool) {
        self.failing_deletes.store(failing, Ordering::SeqCst);
    }

    /// Upserts that reached the underlying store.
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Every call made against this backend, failed or not.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, action: &str, only: &AtomicBool) -> Result<(), AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) || only.load(Ordering::SeqCst) {
            Err(AgentError::PersistenceError(format!(
                "{} failed with status 503 Service Unavailable",
                action
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FileBackend for FailingBackend {
    async fn upsert(&self, record: &FileRecord) -> Result<(), AgentError> {
        self.check("upsert", &self.failing_upserts)?;
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(record).await
    }

    async fn delete(&self, path: &str) -> Result<(), AgentError> {
        self.check("delete", &self.failing_deletes)?;
        self.inner.delete(path).await
    }

    async fn fetch(&self, path: &str) -> Result<Option<FileRecord>, AgentError> {
        self.check("fetch", &self.failing)?;
        self.inner.fetch(path).await
    }

    async fn list(&self) -> Result<Vec<FileRecord>, AgentError> {
        self.check("list", &self.failing)?;
        self.inner.list().await
    }

    fn name(&self) -> &str {
        "failing"
    }
}
