//! Catalog of agent types and their factories.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use agentflow_protocols::{Agent, AgentCapability, AgentConfig, AgentMetadata, RegistryError};

use super::base::{BaseRegistry, Registerable};
use crate::events::{EventBus, Subscription};

/// Builds an agent instance from its effective configuration.
pub type AgentFactory = Arc<dyn Fn(&AgentConfig) -> Arc<dyn Agent> + Send + Sync>;

impl Registerable for dyn Agent {
    fn registry_id(&self) -> &str {
        self.id()
    }
}

struct AgentType {
    metadata: AgentMetadata,
    factory: AgentFactory,
}

impl Registerable for AgentType {
    fn registry_id(&self) -> &str {
        &self.metadata.id
    }
}

/// Agent registry notifications.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    Registered(AgentMetadata),
    Unregistered(String),
    Instantiated { type_id: String, agent_id: String },
}

/// Registry mapping agent type ids to metadata and factories.
pub struct AgentRegistry {
    types: BaseRegistry<AgentType>,
    events: EventBus<RegistryEvent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            types: BaseRegistry::new(),
            events: EventBus::new("agent-registry"),
        }
    }

    /// Register an agent type. An existing type with the same id is replaced.
    pub fn register<F>(&self, metadata: AgentMetadata, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&AgentConfig) -> Arc<dyn Agent> + Send + Sync + 'static,
    {
        let entry = Arc::new(AgentType {
            metadata: metadata.clone(),
            factory: Arc::new(factory),
        });

        if self.types.register_or_replace(entry)?.is_some() {
            warn!("Agent type {} already registered, replacing", metadata.id);
        } else {
            info!("Registered agent type: {}", metadata.id);
        }
        self.events.emit(&RegistryEvent::Registered(metadata));
        Ok(())
    }

    /// Remove an agent type. Returns false if it was not registered.
    pub fn unregister(&self, type_id: &str) -> bool {
        let removed = self.types.unregister(type_id).is_ok();
        if removed {
            info!("Unregistered agent type: {}", type_id);
            self.events
                .emit(&RegistryEvent::Unregistered(type_id.to_string()));
        }
        removed
    }

    /// Build a new agent of the given type.
    ///
    /// The factory receives the type's configuration overlaid with
    /// `overrides`.
    pub fn create(
        &self,
        type_id: &str,
        overrides: Option<&AgentConfig>,
    ) -> Result<Arc<dyn Agent>, RegistryError> {
        let entry = self
            .types
            .get(type_id)
            .ok_or_else(|| RegistryError::NotFound(type_id.to_string()))?;

        let config = match overrides {
            Some(overrides) => entry.metadata.config.merged(overrides),
            None => entry.metadata.config.clone(),
        };
        let agent = (entry.factory)(&config);

        info!("Created agent {} of type {}", agent.id(), type_id);
        self.events.emit(&RegistryEvent::Instantiated {
            type_id: type_id.to_string(),
            agent_id: agent.id().to_string(),
        });
        Ok(agent)
    }

    /// Metadata of every registered type, in registration order.
    pub fn registered_types(&self) -> Vec<AgentMetadata> {
        self.types
            .list()
            .iter()
            .map(|t| t.metadata.clone())
            .collect()
    }

    pub fn type_metadata(&self, type_id: &str) -> Option<AgentMetadata> {
        self.types.get(type_id).map(|t| t.metadata.clone())
    }

    pub fn is_registered(&self, type_id: &str) -> bool {
        self.types.contains(type_id)
    }

    /// Types advertising the given capability id.
    pub fn find_by_capability(&self, capability_id: &str) -> Vec<AgentMetadata> {
        self.types
            .list()
            .iter()
            .filter(|t| t.metadata.capabilities.iter().any(|c| c.id == capability_id))
            .map(|t| t.metadata.clone())
            .collect()
    }

    /// Every distinct capability across registered types.
    pub fn all_capabilities(&self) -> Vec<AgentCapability> {
        let mut seen = HashSet::new();
        let mut capabilities = Vec::new();
        for entry in self.types.list() {
            for capability in &entry.metadata.capabilities {
                if seen.insert(capability.id.clone()) {
                    capabilities.push(capability.clone());
                }
            }
        }
        capabilities
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn clear(&self) {
        self.types.clear();
    }

    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&RegistryEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(handler)
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "agent_types_tests.rs"]
mod tests;
