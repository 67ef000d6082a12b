//! Agent descriptors and the registry that tracks them.

pub mod registry;

pub use registry::{AgentRegistry, ListenerId, RegistryEvent};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Conversation,
    Document,
    Rag,
    Router,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Idle,
    Processing,
    Offline,
}

impl AgentStatus {
    /// Preference when routing work; `None` means the agent cannot take any.
    pub fn routing_rank(&self) -> Option<u8> {
        match self {
            AgentStatus::Active => Some(0),
            AgentStatus::Idle => Some(1),
            AgentStatus::Processing => Some(2),
            AgentStatus::Offline => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentEvent {
    AgentRegistered,
    AgentUnregistered,
    AgentStatusChanged,
    ServerRegistered,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentDescriptor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    pub status: AgentStatus,
    pub capabilities: BTreeSet<String>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl AgentDescriptor {
    pub fn new(id: &str, name: &str, agent_type: AgentType) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            agent_type,
            status: AgentStatus::Idle,
            capabilities: BTreeSet::new(),
            config: Map::new(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: &[&str]) -> Self {
        self.capabilities
            .extend(capabilities.iter().map(|c| c.to_string()));
        self
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_config(mut self, key: &str, value: Value) -> Self {
        self.config.insert(key.to_string(), value);
        self
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

/// The agents every runtime starts with.
pub fn default_agents() -> Vec<AgentDescriptor> {
    vec![
        AgentDescriptor::new("conversation-agent", "Conversation Agent", AgentType::Conversation)
            .with_capabilities(&["chat", "code_generation"])
            .with_status(AgentStatus::Active),
        AgentDescriptor::new("document-agent", "Document Agent", AgentType::Document)
            .with_capabilities(&["document_processing", "summarization"])
            .with_status(AgentStatus::Active),
        AgentDescriptor::new("rag-agent", "Retrieval Agent", AgentType::Rag)
            .with_capabilities(&["retrieval", "search"])
            .with_status(AgentStatus::Active),
        AgentDescriptor::new("router-agent", "Router Agent", AgentType::Router)
            .with_capabilities(&["routing", "delegation"])
            .with_status(AgentStatus::Active),
    ]
}
