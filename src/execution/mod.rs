// ABOUTME: Execution module - runs agents against tasks and records each run.
// ABOUTME: Provides AgentExecutor, ExecutionContext, RunHandle and run outcomes.

mod context;
mod executor;
mod handle;

pub use context::{ExecutionContext, ExecutionSummary, RunOutcome, Step, StepKind, StepLog, Task};
pub use executor::{AgentExecutor, NO_RESULT_ERROR};
pub use handle::{RunHandle, RunStatus};
