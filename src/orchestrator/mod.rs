// ABOUTME: Orchestrator module - message-driven agents, coordinated tasks and
// ABOUTME: multi-step collaborative workflows built on the message bus.

mod orchestrator;
mod workflow;

pub use orchestrator::{CoordinatedTaskResult, MessageHandler, MultiAgentOrchestrator, SYSTEM_SENDER};
pub use workflow::{AgentCollaboration, StepResult, Workflow, WorkflowResult, WorkflowStep};
