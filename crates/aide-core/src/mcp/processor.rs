use crate::agents::AgentRegistry;
use crate::errors::AgentError;
use crate::mcp::message::{INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND};
use crate::mcp::{McpError, McpMessage, MessageKind};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

#[derive(Default)]
pub struct MessageQueue {
    messages: Mutex<VecDeque<McpMessage>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_to_queue(&self, message: McpMessage) {
        log::debug!(
            "Queued {:?} {} from {} to {}",
            message.kind,
            message.id,
            message.from,
            message.to
        );
        self.lock().push_back(message);
    }

    pub fn pop(&self) -> Option<McpMessage> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<McpMessage>> {
        // a poisoned queue still holds valid messages
        self.messages.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: McpMessage) -> Result<(), AgentError>;
}

/// Logs each message and drops it.
pub struct LoggingHandler;

#[async_trait]
impl MessageHandler for LoggingHandler {
    async fn handle(&self, message: McpMessage) -> Result<(), AgentError> {
        log::info!(
            "Message {} ({:?} {}) from {} to {}",
            message.id,
            message.kind,
            message.method.as_deref().unwrap_or("-"),
            message.from,
            message.to
        );
        Ok(())
    }
}

/// Answers `tools/call` and `tools/list` requests against the servers in an
/// [`AgentRegistry`]. Replies go out on the outbound channel.
pub struct ToolRequestHandler {
    registry: Arc<AgentRegistry>,
    outbound: mpsc::UnboundedSender<McpMessage>,
}

impl ToolRequestHandler {
    pub fn new(registry: Arc<AgentRegistry>, outbound: mpsc::UnboundedSender<McpMessage>) -> Self {
        Self { registry, outbound }
    }

    async fn dispatch(&self, message: &McpMessage) -> Result<Value, McpError> {
        let method = message.method.as_deref().unwrap_or_default();
        let params = message.params.clone().unwrap_or(Value::Null);

        match method {
            "tools/list" => {
                let server = self
                    .registry
                    .server(&message.to)
                    .ok_or_else(|| McpError::new(INVALID_PARAMS, format!("Unknown server: {}", message.to)))?;
                Ok(json!({ "tools": server.list_tools() }))
            }
            "tools/call" => {
                let name = params
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| McpError::new(INVALID_PARAMS, "tools/call requires a 'name'"))?;
                let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

                let pending = self
                    .registry
                    .call_tool(&message.to, name, arguments)
                    .map_err(|e| McpError::new(INVALID_PARAMS, e.to_string()))?;
                let output = pending
                    .await
                    .map_err(|e| McpError::new(INTERNAL_ERROR, e.to_string()))?;
                Ok(output.to_value())
            }
            other => Err(McpError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )),
        }
    }
}

#[async_trait]
impl MessageHandler for ToolRequestHandler {
    async fn handle(&self, message: McpMessage) -> Result<(), AgentError> {
        if message.kind != MessageKind::Request {
            log::debug!("Ignoring {:?} {} from {}", message.kind, message.id, message.from);
            return Ok(());
        }

        let outcome = self.dispatch(&message).await;
        if let Err(e) = &outcome {
            log::warn!("Request {} to {} failed: {}", message.id, message.to, e.message);
        }

        self.outbound
            .send(message.response(outcome))
            .map_err(|_| AgentError::InternalError("Response channel closed".to_string()))
    }
}

/// Drains a [`MessageQueue`] one message per tick.
///
/// Each message runs on its own task, so a handler that errors or panics
/// costs that message only.
pub struct MessageProcessor {
    queue: Arc<MessageQueue>,
    handler: Arc<dyn MessageHandler>,
    tick: Duration,
}

impl MessageProcessor {
    pub fn new(queue: Arc<MessageQueue>, handler: Arc<dyn MessageHandler>) -> Self {
        Self {
            queue,
            handler,
            tick: DEFAULT_TICK,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn queue(&self) -> &Arc<MessageQueue> {
        &self.queue
    }

    pub fn add_to_queue(&self, message: McpMessage) {
        self.queue.add_to_queue(message);
    }

    /// Pop and handle one message. Returns `false` when the queue was empty.
    pub async fn process_next(&self) -> bool {
        let message = match self.queue.pop() {
            Some(message) => message,
            None => return false,
        };

        let id = message.id.clone();
        let handler = self.handler.clone();
        match tokio::spawn(async move { handler.handle(message).await }).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("Handler failed for message {}: {}", id, e),
            Err(e) => log::error!("Handler aborted on message {}: {}", id, e),
        }
        true
    }

    /// Run the polling loop on a new task until `cancel` fires.
    pub fn start(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            log::info!("Message processor started with a {:?} tick", self.tick);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.process_next().await;
                    }
                }
            }
            log::info!(
                "Message processor stopped with {} messages queued",
                self.queue.len()
            );
        })
    }
}
