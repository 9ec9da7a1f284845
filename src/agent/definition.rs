// ABOUTME: Agent definition types - a named agent and the ordered tools it may use.
// ABOUTME: AgentRegistry resolves agent names and enumerates their capabilities.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::tool::{ToolFactory, ToolRegistry};

/// Definition of an agent.
///
/// Serializes to the persisted shape
/// `{name, description, tools, system_prompt, config}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Unique name.
    pub name: String,

    /// Human-readable description.
    pub description: String,

    /// Tool names in dispatch order.
    #[serde(default)]
    pub tools: Vec<String>,

    /// System prompt for model-backed runners.
    #[serde(default)]
    pub system_prompt: String,

    /// Free-form configuration.
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl AgentDefinition {
    /// Create a new agent definition with required fields.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tools: Vec::new(),
            system_prompt: String::new(),
            config: Map::new(),
        }
    }

    /// Set the tools, in dispatch order.
    pub fn tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Append one tool.
    pub fn tool(mut self, name: impl Into<String>) -> Self {
        self.tools.push(name.into());
        self
    }

    /// Set the system prompt.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set one configuration entry.
    pub fn config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

/// Registry of agent definitions, backed by a [`ToolRegistry`].
#[derive(Default)]
pub struct AgentRegistry {
    agents: Arc<RwLock<HashMap<String, AgentDefinition>>>,
    tools: ToolRegistry,
}

impl AgentRegistry {
    /// Create an empty agent registry resolving tools from `tools`.
    pub fn new(tools: ToolRegistry) -> Self {
        Self {
            agents: Arc::default(),
            tools,
        }
    }

    /// The tool registry agents resolve against.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Register an agent definition, replacing any with the same name.
    pub async fn register(&self, definition: AgentDefinition) {
        let mut agents = self.agents.write().await;
        agents.insert(definition.name.clone(), definition);
    }

    /// Get an agent definition by name.
    pub async fn get(&self, name: &str) -> Option<AgentDefinition> {
        let agents = self.agents.read().await;
        agents.get(name).cloned()
    }

    /// Remove an agent definition.
    pub async fn remove(&self, name: &str) -> Option<AgentDefinition> {
        let mut agents = self.agents.write().await;
        agents.remove(name)
    }

    /// List all registered agent names, sorted.
    pub async fn list(&self) -> Vec<String> {
        let agents = self.agents.read().await;
        let mut names: Vec<_> = agents.keys().cloned().collect();
        names.sort();
        names
    }

    /// Constructors for an agent's tools, in declared order.
    ///
    /// Names with no registered tool are skipped.
    pub async fn capabilities(&self, agent: &AgentDefinition) -> Vec<(String, ToolFactory)> {
        let mut resolved = Vec::with_capacity(agent.tools.len());
        for name in &agent.tools {
            match self.tools.get(name).await {
                Some(factory) => resolved.push((name.clone(), factory)),
                None => tracing::debug!(agent = %agent.name, tool = %name, "skipping unregistered tool"),
            }
        }
        resolved
    }
}

impl Clone for AgentRegistry {
    fn clone(&self) -> Self {
        Self {
            agents: Arc::clone(&self.agents),
            tools: self.tools.clone(),
        }
    }
}
