// ABOUTME: Agent module - named agents and the registry that resolves them.
// ABOUTME: Maps each agent to the ordered tool constructors it may dispatch.

mod definition;

pub use definition::{AgentDefinition, AgentRegistry};
