// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use relay::prelude::*;` to get started quickly.

pub use crate::agent::{AgentDefinition, AgentRegistry};
pub use crate::bus::{Message, MessageBus, MessageFilter, MessageType, Subscription};
pub use crate::config::RuntimeConfig;
pub use crate::environment::{Environment, ResultBatch, SELF_INFO_KEY, SummaryEntry};
pub use crate::error::{
    BusError, ConfigError, ExecutionError, RelayError, ToolError, WorkflowError,
};
pub use crate::execution::{
    AgentExecutor, ExecutionContext, ExecutionSummary, NO_RESULT_ERROR, RunHandle, RunOutcome,
    RunStatus, StepKind, Task,
};
pub use crate::orchestrator::{
    AgentCollaboration, CoordinatedTaskResult, MultiAgentOrchestrator, Workflow, WorkflowResult,
    WorkflowStep,
};
pub use crate::search::{MemoryVectorStore, SearchHit, VectorStore};
pub use crate::tool::{
    Event, EventStream, InputField, InputSchema, InputType, Tool, ToolFactory, ToolOutput,
    ToolRegistry,
};
pub use crate::tools::{
    EnvironmentSummaryTool, HiddenStoreReaderTool, HiddenStoreWriterTool, SafeMathTool,
    TellAJokeTool, UNLOCK_KEY, VectorSearchTool,
};
