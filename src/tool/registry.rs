// ABOUTME: Implements the ToolRegistry - a thread-safe map from tool names to
// ABOUTME: constructors, so every invocation gets a fresh tool instance.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use super::{InputSchema, Tool};
use crate::error::ToolError;

/// Builds a fresh tool instance.
pub type ToolFactory = Arc<dyn Fn() -> Box<dyn Tool> + Send + Sync>;

/// Static description of a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub inputs: InputSchema,
    pub ends_run: bool,
}

impl ToolDescriptor {
    fn of(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            inputs: tool.inputs(),
            ends_run: tool.ends_run(),
        }
    }
}

/// A thread-safe registry of tool constructors.
///
/// Tools are registered explicitly, usually once at startup; agents refer to
/// them by name.
#[derive(Default)]
pub struct ToolRegistry {
    factories: Arc<RwLock<HashMap<String, ToolFactory>>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in example tools.
    pub async fn with_builtin_tools() -> Self {
        let registry = Self::new();
        crate::tools::register_builtin(&registry).await;
        registry
    }

    /// Register a tool type built with `Default`.
    pub async fn register<T: Tool + Default + 'static>(&self) -> String {
        self.register_factory(|| Box::new(T::default()) as Box<dyn Tool>)
            .await
    }

    /// Register a constructor. The tool's name is read from one instance.
    pub async fn register_factory<F>(&self, factory: F) -> String
    where
        F: Fn() -> Box<dyn Tool> + Send + Sync + 'static,
    {
        let name = factory().name().to_string();
        let mut factories = self.factories.write().await;
        factories.insert(name.clone(), Arc::new(factory));
        name
    }

    /// Unregister a tool by name.
    pub async fn unregister(&self, name: &str) {
        let mut factories = self.factories.write().await;
        factories.remove(name);
    }

    /// Get a tool constructor by name.
    pub async fn get(&self, name: &str) -> Option<ToolFactory> {
        let factories = self.factories.read().await;
        factories.get(name).cloned()
    }

    /// Build a fresh instance of a tool.
    pub async fn create(&self, name: &str) -> Result<Box<dyn Tool>, ToolError> {
        self.get(name)
            .await
            .map(|factory| factory())
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// List all tool names, sorted alphabetically.
    pub async fn list(&self) -> Vec<String> {
        let factories = self.factories.read().await;
        let mut names: Vec<_> = factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get the number of registered tools.
    pub async fn count(&self) -> usize {
        let factories = self.factories.read().await;
        factories.len()
    }

    /// Describe all registered tools, sorted by name.
    pub async fn descriptors(&self) -> Vec<ToolDescriptor> {
        let factories = self.factories.read().await;
        let mut descriptors: Vec<_> = factories
            .values()
            .map(|factory| ToolDescriptor::of(factory().as_ref()))
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }
}

impl Clone for ToolRegistry {
    fn clone(&self) -> Self {
        Self {
            factories: Arc::clone(&self.factories),
        }
    }
}
