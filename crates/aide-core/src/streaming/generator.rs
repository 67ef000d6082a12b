use crate::config::GeneratorConfig;
use crate::errors::AgentError;
use crate::files::{normalize_path, FileStore};
use crate::llm::{ByteStream, ChatMessage, StreamingLLM};
use crate::streaming::parser::{OperationParser, ParsedBlock};
use crate::streaming::sse::{extract_delta, SseDecoder, SseFrame};
use crate::streaming::{FileOperation, OperationKind, StreamObserver, StreamProgress, StreamStatus};
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert software engineer working inside a browser IDE.
When you create or change a file, write it out in full using exactly this format:

🔧 CREATE_FILE: /path/to/file.ext
<complete file content>🔧 END_FILE

🔧 UPDATE_FILE: /path/to/file.ext
<complete new file content>🔧 END_FILE

Use absolute project paths starting with '/'. Put any explanation outside the file blocks."#;

const MAX_CONTEXT_PATHS: usize = 200;

/// Result of a session that reached `complete`.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub text: String,
    pub tokens_received: usize,
    pub response_time_ms: u64,
    pub operations: Vec<FileOperation>,
    /// Paths whose block was parsed but could not be written to the store.
    pub failed_writes: Vec<String>,
}

/// Drives streaming code generation. At most one session runs at a time per
/// generator; a second call while one is active fails with
/// [`AgentError::ConcurrentStream`] instead of queueing.
///
/// The guard is per instance. [`crate::AideFactory`] builds exactly one
/// generator per runtime and hands it out as `Aide::generator`, which makes it
/// the only writer of generated files into that runtime's store. Building a
/// second generator over the same [`FileStore`] bypasses the guard.
pub struct StreamingCodeGenerator {
    llm: Arc<dyn StreamingLLM>,
    files: Arc<FileStore>,
    config: GeneratorConfig,
    streaming: AtomicBool,
}

struct StreamGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for StreamGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

enum Flow {
    Continue,
    Done,
}

struct StreamingSession {
    status: StreamStatus,
    text: String,
    tokens_received: usize,
    started: Instant,
    parser: OperationParser,
    processed: HashSet<Vec<u8>>,
    operations: Vec<FileOperation>,
    failed_writes: Vec<String>,
    progress_interval: usize,
}

impl StreamingSession {
    fn new(progress_interval: usize) -> Self {
        Self {
            status: StreamStatus::Idle,
            text: String::new(),
            tokens_received: 0,
            started: Instant::now(),
            parser: OperationParser::new(),
            processed: HashSet::new(),
            operations: Vec::new(),
            failed_writes: Vec::new(),
            progress_interval,
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn report(&self, observer: &dyn StreamObserver) {
        observer.on_progress(&StreamProgress {
            tokens_received: self.tokens_received,
            response_time_ms: self.elapsed_ms(),
            status: self.status,
        });
    }

    /// Record a token and return the blocks it completed that this session has
    /// not seen before.
    fn push_token(&mut self, token: &str) -> Vec<ParsedBlock> {
        self.tokens_received += 1;
        self.text.push_str(token);

        self.parser
            .feed(token)
            .into_iter()
            .filter(|block| {
                let fingerprint = Sha256::digest(block.raw.as_bytes()).to_vec();
                let fresh = self.processed.insert(fingerprint);
                if !fresh {
                    log::debug!("Skipping repeated {:?} block for {}", block.kind, block.path);
                }
                fresh
            })
            .collect()
    }

    fn progress_due(&self) -> bool {
        self.progress_interval > 0 && self.tokens_received % self.progress_interval == 0
    }

    fn complete(mut self, observer: &dyn StreamObserver) -> GenerationOutcome {
        self.status = StreamStatus::Complete;
        self.report(observer);
        if self.parser.is_inside_block() {
            log::warn!("Stream completed inside an unterminated file block");
        }

        let outcome = GenerationOutcome {
            response_time_ms: self.elapsed_ms(),
            text: self.text,
            tokens_received: self.tokens_received,
            operations: self.operations,
            failed_writes: self.failed_writes,
        };
        log::info!(
            "Generation complete: {} tokens, {} file operations in {}ms",
            outcome.tokens_received,
            outcome.operations.len(),
            outcome.response_time_ms
        );
        outcome
    }

    fn fail(mut self, error: AgentError, observer: &dyn StreamObserver) -> AgentError {
        self.status = StreamStatus::Error;
        self.report(observer);
        log::error!(
            "Generation failed after {} tokens: {}",
            self.tokens_received,
            error
        );
        error
    }
}

impl StreamingCodeGenerator {
    pub fn new(llm: Arc<dyn StreamingLLM>, files: Arc<FileStore>) -> Self {
        Self {
            llm,
            files,
            config: GeneratorConfig::default(),
            streaming: AtomicBool::new(false),
        }
    }

    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    pub async fn stream_code_generation(
        &self,
        prompt: &str,
        observer: &dyn StreamObserver,
    ) -> Result<GenerationOutcome, AgentError> {
        self.stream_code_generation_with_cancel(prompt, observer, CancellationToken::new())
            .await
    }

    /// Like [`Self::stream_code_generation`], ending the session with
    /// [`AgentError::Cancelled`] as soon as `cancel` fires.
    pub async fn stream_code_generation_with_cancel(
        &self,
        prompt: &str,
        observer: &dyn StreamObserver,
        cancel: CancellationToken,
    ) -> Result<GenerationOutcome, AgentError> {
        self.llm.validate()?;
        let _guard = self.acquire()?;

        let mut session = StreamingSession::new(self.config.progress_interval);
        session.status = StreamStatus::Streaming;
        log::info!("Starting generation with model {}", self.llm.model());

        let messages = self.build_messages(prompt).await;
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Cancelled),
            opened = self.llm.stream_chat(messages) => opened,
        };

        match opened {
            Ok(body) => self.drive(session, body, observer, &cancel).await,
            Err(e) => Err(session.fail(e, observer)),
        }
    }

    fn acquire(&self) -> Result<StreamGuard<'_>, AgentError> {
        self.streaming
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                log::warn!("Rejected generation request: a stream is already active");
                AgentError::ConcurrentStream
            })?;
        Ok(StreamGuard {
            flag: &self.streaming,
        })
    }

    async fn build_messages(&self, prompt: &str) -> Vec<ChatMessage> {
        let mut system = self
            .config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        if self.config.include_project_context {
            let paths = self.files.list_paths().await;
            if !paths.is_empty() {
                system.push_str("\n\nExisting project files:\n");
                for path in paths.iter().take(MAX_CONTEXT_PATHS) {
                    system.push_str("- ");
                    system.push_str(path);
                    system.push('\n');
                }
                if paths.len() > MAX_CONTEXT_PATHS {
                    system.push_str(&format!("... and {} more\n", paths.len() - MAX_CONTEXT_PATHS));
                }
            }
        }

        vec![ChatMessage::system(system), ChatMessage::user(prompt)]
    }

    async fn drive(
        &self,
        mut session: StreamingSession,
        mut body: ByteStream,
        observer: &dyn StreamObserver,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome, AgentError> {
        let mut decoder = SseDecoder::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(session.fail(AgentError::Cancelled, observer)),
                next = body.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    for frame in decoder.push(&chunk) {
                        if let Flow::Done = self.handle_frame(&mut session, frame, observer).await {
                            return Ok(session.complete(observer));
                        }
                    }
                }
                Some(Err(e)) => return Err(session.fail(e, observer)),
                None => {
                    if let Some(frame) = decoder.finish() {
                        if let Flow::Done = self.handle_frame(&mut session, frame, observer).await {
                            return Ok(session.complete(observer));
                        }
                    }
                    log::warn!("Stream ended without a [DONE] frame");
                    return Ok(session.complete(observer));
                }
            }
        }
    }

    async fn handle_frame(
        &self,
        session: &mut StreamingSession,
        frame: SseFrame,
        observer: &dyn StreamObserver,
    ) -> Flow {
        let payload = match frame {
            SseFrame::Done => return Flow::Done,
            SseFrame::Data(payload) => payload,
        };

        let token = match extract_delta(&payload) {
            Ok(Some(token)) => token,
            Ok(None) => return Flow::Continue,
            Err(e) => {
                log::warn!("Skipping malformed stream frame: {} ({})", e, payload);
                return Flow::Continue;
            }
        };

        log::trace!("token: {:?}", token);
        let blocks = session.push_token(&token);
        observer.on_token(&token);

        for block in blocks {
            let operation = self.apply(session, block).await;
            observer.on_file_operation(&operation);
            session.operations.push(operation);
        }

        if session.progress_due() {
            session.report(observer);
        }
        Flow::Continue
    }

    async fn apply(&self, session: &mut StreamingSession, block: ParsedBlock) -> FileOperation {
        let written = match block.kind {
            OperationKind::Create => self.files.create_file(&block.path, &block.content).await,
            OperationKind::Update => self.files.update_file(&block.path, &block.content).await,
        };

        let path = match written {
            Ok(record) => {
                log::info!("Applied {:?} for {}", block.kind, record.path);
                record.path
            }
            Err(e) => {
                log::error!("Could not write generated file {}: {}", block.path, e);
                let path = normalize_path(&block.path).unwrap_or_else(|_| block.path.clone());
                session.failed_writes.push(path.clone());
                path
            }
        };

        FileOperation {
            kind: block.kind,
            path,
            content: Some(block.content),
        }
    }
}
