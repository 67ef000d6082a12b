//! Builds a wired [`Aide`] runtime from an [`AideConfig`]

use crate::agents::AgentRegistry;
use crate::config::{AideConfig, PersistenceBackend};
use crate::errors::AgentError;
use crate::files::{FileBackend, FileStore, MemoryBackend, SupabaseBackend};
use crate::llm::{OpenAIStreamClient, StreamingLLM};
use crate::mcp::{McpMessage, MessageProcessor, MessageQueue, ToolRequestHandler};
use crate::streaming::StreamingCodeGenerator;
use crate::tools::FileOperationsServer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One file store shared by the generator and the file tools, plus the agent
/// registry and message loop in front of them.
pub struct Aide {
    pub config: AideConfig,
    pub files: Arc<FileStore>,
    pub file_server: Arc<FileOperationsServer>,
    pub registry: Arc<AgentRegistry>,
    pub processor: Arc<MessageProcessor>,
    /// The only generator for `files`; it serializes generation sessions.
    pub generator: Arc<StreamingCodeGenerator>,
    /// Replies produced by the message processor.
    pub responses: mpsc::UnboundedReceiver<McpMessage>,
}

impl Aide {
    pub fn queue(&self) -> &Arc<MessageQueue> {
        self.processor.queue()
    }

    pub fn start_processor(&self, cancel: CancellationToken) -> JoinHandle<()> {
        self.processor.clone().start(cancel)
    }
}

/// Factory for creating configured runtimes from AideConfig
pub struct AideFactory;

impl AideFactory {
    pub fn create_from_config(config: AideConfig) -> Result<Aide, AgentError> {
        let llm: Arc<dyn StreamingLLM> = Arc::new(OpenAIStreamClient::from_config(&config.llm));
        Self::create_with_llm(config, llm)
    }

    /// Build a runtime around an already constructed model client.
    pub fn create_with_llm(config: AideConfig, llm: Arc<dyn StreamingLLM>) -> Result<Aide, AgentError> {
        config.validate()?;

        let backend = Self::configure_backend(&config.persistence.backend)?;
        log::info!("Using {} persistence", backend.name());
        let files = Arc::new(FileStore::new(backend));

        let file_server = Arc::new(FileOperationsServer::new(files.clone()));
        let registry = Arc::new(AgentRegistry::with_default_agents());
        registry.register_server(file_server.clone());

        let (outbound, responses) = mpsc::unbounded_channel();
        let handler = Arc::new(ToolRequestHandler::new(registry.clone(), outbound));
        let processor = Arc::new(
            MessageProcessor::new(Arc::new(MessageQueue::new()), handler)
                .with_tick(Duration::from_millis(config.queue.tick_ms)),
        );

        let generator = Arc::new(
            StreamingCodeGenerator::new(llm, files.clone()).with_config(config.generator.clone()),
        );

        Ok(Aide {
            config,
            files,
            file_server,
            registry,
            processor,
            generator,
            responses,
        })
    }

    fn configure_backend(backend: &PersistenceBackend) -> Result<Arc<dyn FileBackend>, AgentError> {
        match backend {
            PersistenceBackend::Memory => Ok(Arc::new(MemoryBackend::new())),
            PersistenceBackend::Supabase {
                url,
                table,
                service_key,
                service_key_env,
            } => {
                let key = service_key.clone().ok_or_else(|| {
                    AgentError::ConfigError(format!(
                        "No Supabase service key configured. Set service_key or {}",
                        service_key_env.as_deref().unwrap_or("service_key_env")
                    ))
                })?;
                Ok(Arc::new(
                    SupabaseBackend::new(url.clone(), key).with_table(table.clone()),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::MessageKind;
    use crate::test_utils::{MockStreamingLLM, RecordingObserver};
    use serde_json::json;

    #[tokio::test]
    async fn test_generator_and_tools_share_one_store() {
        let llm = Arc::new(MockStreamingLLM::with_tokens(&[
            "🔧 CREATE_FILE: /src/app.ts\nexport {}",
            "🔧 END_FILE",
        ]));
        let aide = AideFactory::create_with_llm(AideConfig::default(), llm).unwrap();

        aide.generator
            .stream_code_generation("scaffold", &RecordingObserver::new())
            .await
            .unwrap();

        let read = aide
            .registry
            .call_tool("file-operations", "read_file", json!({"path": "/src/app.ts"}))
            .unwrap()
            .await
            .unwrap();
        assert_eq!(read.extra["content"], "export {}");
        assert_eq!(aide.registry.agent_count(), 4);
    }

    #[tokio::test]
    async fn test_queued_request_gets_response() {
        let llm = Arc::new(MockStreamingLLM::with_tokens(&[]));
        let mut aide = AideFactory::create_with_llm(AideConfig::default(), llm).unwrap();

        let request = McpMessage::request(
            "router-agent",
            "file-operations",
            "tools/call",
            json!({"name": "create_file", "arguments": {"path": "/a.md", "content": "# a"}}),
        );
        aide.queue().add_to_queue(request.clone());
        assert!(aide.processor.process_next().await);

        let reply = aide.responses.recv().await.unwrap();
        assert_eq!(reply.kind, MessageKind::Response);
        assert_eq!(reply.id, request.id);
        assert_eq!(aide.files.read_file("/a.md").await.as_deref(), Some("# a"));
    }

    #[test]
    fn test_supabase_without_key_is_config_error() {
        let mut config = AideConfig::default();
        config.persistence.backend = PersistenceBackend::Supabase {
            url: "http://localhost:54321".to_string(),
            table: "project_files".to_string(),
            service_key: None,
            service_key_env: None,
        };
        let result = AideFactory::create_with_llm(config, Arc::new(MockStreamingLLM::with_tokens(&[])));
        assert!(matches!(result, Err(AgentError::ConfigError(_))));
    }
}
