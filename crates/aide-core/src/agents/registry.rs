//! Agent registry: descriptors by id, tool servers by name, and change events.
//!
//! Listeners run synchronously on the caller's thread after the registry's
//! locks are released, so a listener may call back into the registry.

use crate::agents::{default_agents, AgentDescriptor, AgentEvent, AgentStatus};
use crate::errors::AgentError;
use crate::mcp::McpServer;
use crate::tools::ToolFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// What changed. `subject` is the agent id or the server name.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEvent {
    pub event: AgentEvent,
    pub subject: String,
    pub agent: Option<AgentDescriptor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&RegistryEvent) + Send + Sync>;

pub struct AgentRegistry {
    agents: RwLock<HashMap<String, AgentDescriptor>>,
    servers: RwLock<HashMap<String, Arc<dyn McpServer>>>,
    listeners: RwLock<Vec<(ListenerId, AgentEvent, Listener)>>,
    next_listener: AtomicU64,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            servers: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    pub fn with_default_agents() -> Self {
        let registry = Self::new();
        for agent in default_agents() {
            registry.register_agent(agent);
        }
        registry
    }

    /// Insert or overwrite an agent.
    pub fn register_agent(&self, agent: AgentDescriptor) {
        let id = agent.id.clone();
        write(&self.agents).insert(id.clone(), agent.clone());
        log::info!("Registered agent {}", id);
        self.emit(RegistryEvent {
            event: AgentEvent::AgentRegistered,
            subject: id,
            agent: Some(agent),
        });
    }

    pub fn unregister_agent(&self, id: &str) -> Result<AgentDescriptor, AgentError> {
        let removed = write(&self.agents)
            .remove(id)
            .ok_or_else(|| AgentError::AgentNotFound(id.to_string()))?;
        log::info!("Unregistered agent {}", id);
        self.emit(RegistryEvent {
            event: AgentEvent::AgentUnregistered,
            subject: id.to_string(),
            agent: Some(removed.clone()),
        });
        Ok(removed)
    }

    pub fn set_agent_status(&self, id: &str, status: AgentStatus) -> Result<(), AgentError> {
        let updated = {
            let mut agents = write(&self.agents);
            let agent = agents
                .get_mut(id)
                .ok_or_else(|| AgentError::AgentNotFound(id.to_string()))?;
            if agent.status == status {
                return Ok(());
            }
            agent.status = status;
            agent.clone()
        };

        log::debug!("Agent {} is now {:?}", id, status);
        self.emit(RegistryEvent {
            event: AgentEvent::AgentStatusChanged,
            subject: id.to_string(),
            agent: Some(updated),
        });
        Ok(())
    }

    pub fn get_agent(&self, id: &str) -> Option<AgentDescriptor> {
        read(&self.agents).get(id).cloned()
    }

    /// Every agent, sorted by id.
    pub fn list_agents(&self) -> Vec<AgentDescriptor> {
        let mut agents: Vec<AgentDescriptor> = read(&self.agents).values().cloned().collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }

    pub fn agent_count(&self) -> usize {
        read(&self.agents).len()
    }

    /// Agents advertising `capability`, sorted by id.
    pub fn find_by_capability(&self, capability: &str) -> Vec<AgentDescriptor> {
        let mut found: Vec<AgentDescriptor> = read(&self.agents)
            .values()
            .filter(|agent| agent.has_capability(capability))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found
    }

    /// The agent that should take work needing `capability`: active before
    /// idle before processing, offline never, ties by id.
    pub fn route(&self, capability: &str) -> Option<AgentDescriptor> {
        self.find_by_capability(capability)
            .into_iter()
            .filter_map(|agent| agent.status.routing_rank().map(|rank| (rank, agent)))
            .min_by(|(ra, a), (rb, b)| ra.cmp(rb).then_with(|| a.id.cmp(&b.id)))
            .map(|(_, agent)| agent)
    }

    /// Insert or overwrite a server under its own name.
    pub fn register_server(&self, server: Arc<dyn McpServer>) {
        let name = server.name().to_string();
        write(&self.servers).insert(name.clone(), server);
        log::info!("Registered MCP server {}", name);
        self.emit(RegistryEvent {
            event: AgentEvent::ServerRegistered,
            subject: name,
            agent: None,
        });
    }

    pub fn server(&self, name: &str) -> Option<Arc<dyn McpServer>> {
        read(&self.servers).get(name).cloned()
    }

    pub fn server_names(&self) -> Vec<String> {
        let mut names: Vec<String> = read(&self.servers).keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve `server` and `tool` and return the pending call. Both lookups
    /// fail before any work is scheduled.
    pub fn call_tool(&self, server: &str, tool: &str, params: Value) -> Result<ToolFuture, AgentError> {
        let target = self
            .server(server)
            .ok_or_else(|| AgentError::UnknownServer(server.to_string()))?;
        target.call_tool(tool, params)
    }

    pub fn add_event_listener<F>(&self, event: AgentEvent, listener: F) -> ListenerId
    where
        F: Fn(&RegistryEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        write(&self.listeners).push((id, event, Arc::new(listener)));
        id
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut listeners = write(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(listener_id, _, _)| *listener_id != id);
        listeners.len() != before
    }

    fn emit(&self, event: RegistryEvent) {
        let targets: Vec<Listener> = read(&self.listeners)
            .iter()
            .filter(|(_, kind, _)| *kind == event.event)
            .map(|(_, _, listener)| listener.clone())
            .collect();

        for listener in targets {
            listener(&event);
        }
    }
}
