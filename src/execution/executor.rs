// ABOUTME: AgentExecutor - runs an agent's capabilities in order against one
// ABOUTME: environment under a deadline, tracking live runs and archiving history.

use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{ExecutionContext, ExecutionSummary, RunHandle, RunOutcome, RunStatus, StepKind, StepLog, Task};
use crate::agent::AgentRegistry;
use crate::config::RuntimeConfig;
use crate::environment::Environment;
use crate::error::ExecutionError;
use crate::tool::{Event, Tool, ToolFactory};

/// Result payload when no capability produced a result.
pub const NO_RESULT_ERROR: &str = "No suitable tool found or all tools failed";

type ActiveRuns = Arc<Mutex<HashMap<String, ActiveRun>>>;
type History = Arc<Mutex<VecDeque<ExecutionContext>>>;

struct ActiveRun {
    agent: String,
    handle: Arc<RunHandle>,
}

/// Runs agents and keeps track of their executions.
///
/// Cloning is cheap; clones share the active-run table and the history.
pub struct AgentExecutor {
    agents: AgentRegistry,
    config: RuntimeConfig,
    active: ActiveRuns,
    history: History,
}

impl AgentExecutor {
    pub fn new(agents: AgentRegistry, config: RuntimeConfig) -> Self {
        Self {
            agents,
            config,
            active: Arc::default(),
            history: Arc::default(),
        }
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Run `agent` on `task` with a fresh environment.
    ///
    /// Only an unknown agent is an `Err`; timeouts, cancellation and
    /// capability failures are reported in the returned outcome.
    pub async fn run(
        &self,
        agent: &str,
        task: Task,
        timeout: Duration,
        max_steps: usize,
    ) -> Result<RunOutcome, ExecutionError> {
        self.execute(agent, task, Environment::new(), timeout, max_steps)
            .await
    }

    /// Run with the configured timeout and step limit.
    pub async fn run_task(&self, agent: &str, task: Task) -> Result<RunOutcome, ExecutionError> {
        self.run(
            agent,
            task,
            self.config.run_timeout_duration(),
            self.config.max_steps,
        )
        .await
    }

    /// Run against a caller-supplied environment.
    ///
    /// The final environment is kept with the archived context; read it back
    /// with [`history_record`](Self::history_record).
    pub async fn run_with_environment(
        &self,
        agent: &str,
        task: Task,
        environment: Environment,
        timeout: Duration,
        max_steps: usize,
    ) -> Result<RunOutcome, ExecutionError> {
        self.execute(agent, task, environment, timeout, max_steps)
            .await
    }

    /// Live view of an active run; `None` once it has finished.
    pub fn execution_status(&self, execution_id: &str) -> Option<ExecutionSummary> {
        let active = self.active.lock();
        active.get(execution_id).map(|run| ExecutionSummary {
            execution_id: execution_id.to_string(),
            agent: run.agent.clone(),
            status: run.handle.status(),
            steps: run.handle.steps(),
            duration_seconds: None,
        })
    }

    /// Ids of runs currently in progress.
    pub fn active_executions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.active.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// The most recent `limit` finished runs, oldest first.
    pub fn history(&self, limit: usize) -> Vec<ExecutionSummary> {
        let history = self.history.lock();
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).map(ExecutionContext::summary).collect()
    }

    /// The full archived context of a finished run.
    pub fn history_record(&self, execution_id: &str) -> Option<ExecutionContext> {
        let history = self.history.lock();
        history
            .iter()
            .rev()
            .find(|ctx| ctx.execution_id == execution_id)
            .cloned()
    }

    /// Cancel a live run. Returns false for unknown or already finished runs.
    pub fn cancel(&self, execution_id: &str) -> bool {
        let handle = {
            let active = self.active.lock();
            match active.get(execution_id) {
                Some(run) => Arc::clone(&run.handle),
                None => return false,
            }
        };
        let cancelled = handle.cancel();
        if cancelled {
            info!(execution_id = %execution_id, "execution cancelled");
        }
        cancelled
    }

    async fn execute(
        &self,
        agent_name: &str,
        task: Task,
        environment: Environment,
        timeout: Duration,
        max_steps: usize,
    ) -> Result<RunOutcome, ExecutionError> {
        let agent = self
            .agents
            .get(agent_name)
            .await
            .ok_or_else(|| ExecutionError::AgentNotFound(agent_name.to_string()))?;
        let capabilities = self.agents.capabilities(&agent).await;

        let handle = Arc::new(RunHandle::new());
        let context = ExecutionContext::new(&agent.name, task, environment, handle.step_counter());
        let execution_id = context.execution_id.clone();
        self.active.lock().insert(
            execution_id.clone(),
            ActiveRun {
                agent: agent.name.clone(),
                handle: Arc::clone(&handle),
            },
        );
        let mut guard = RunGuard {
            context: None,
            handle: Arc::clone(&handle),
            active: Arc::clone(&self.active),
            history: Arc::clone(&self.history),
            history_limit: self.config.history_limit,
        };
        let context = guard.context.insert(context);
        if handle.set_running() {
            context.status = RunStatus::Running;
        }
        info!(execution_id = %execution_id, agent = %agent.name, tools = capabilities.len(), "execution started");

        let task_value = serde_json::to_value(&context.task).unwrap_or(Value::Null);
        context.steps.record(StepKind::Start, json!({ "task": task_value }));

        let finished = tokio::select! {
            biased;
            _ = handle.wait() => Finished::Cancelled,
            dispatched = tokio::time::timeout(timeout, dispatch(&capabilities, context, max_steps)) => {
                match dispatched {
                    Ok(outcome) => Finished::Dispatched(outcome),
                    Err(_) => Finished::TimedOut,
                }
            }
        };

        let (mut status, mut result, mut error) = match finished {
            Finished::Dispatched(Dispatch::Result(value)) => (RunStatus::Completed, Some(value), None),
            Finished::Dispatched(Dispatch::Exhausted) => (
                RunStatus::Completed,
                Some(json!({ "error": NO_RESULT_ERROR })),
                None,
            ),
            Finished::Dispatched(Dispatch::StepLimit) => (
                RunStatus::Error,
                None,
                Some(format!("Execution exceeded {} steps", max_steps)),
            ),
            Finished::TimedOut => {
                warn!(execution_id = %execution_id, timeout_secs = timeout.as_secs_f64(), "execution timed out");
                (
                    RunStatus::Timeout,
                    None,
                    Some(format!("Execution exceeded {} seconds", timeout.as_secs_f64())),
                )
            }
            Finished::Cancelled => (RunStatus::Cancelled, None, Some(CANCELLED.to_string())),
        };

        if !handle.finish(status) {
            // A concurrent cancel landed first and its outcome carries no result.
            status = handle.status();
            if status == RunStatus::Cancelled {
                result = None;
                error = Some(CANCELLED.to_string());
            }
        }

        if let Some(value) = &result {
            context.steps.record(StepKind::Result, json!({ "result": value }));
        }
        context.complete(status, result, error);
        let outcome = context.outcome();
        info!(
            execution_id = %execution_id,
            status = %outcome.status,
            steps = outcome.steps,
            duration_secs = outcome.duration_seconds,
            "execution finished"
        );
        drop(guard);
        Ok(outcome)
    }
}

impl Clone for AgentExecutor {
    fn clone(&self) -> Self {
        Self {
            agents: self.agents.clone(),
            config: self.config.clone(),
            active: Arc::clone(&self.active),
            history: Arc::clone(&self.history),
        }
    }
}

const CANCELLED: &str = "Execution cancelled";

enum Finished {
    Dispatched(Dispatch),
    TimedOut,
    Cancelled,
}

enum Dispatch {
    Result(Value),
    Exhausted,
    StepLimit,
}

enum Invocation {
    Result(Value),
    Failed,
}

/// Removes the run from the active table and archives its context exactly
/// once, however the run ends. A run whose future is dropped mid-flight is
/// archived as cancelled.
struct RunGuard {
    context: Option<ExecutionContext>,
    handle: Arc<RunHandle>,
    active: ActiveRuns,
    history: History,
    history_limit: usize,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let Some(mut context) = self.context.take() else {
            return;
        };
        if !context.is_finished() {
            self.handle.cancel();
            warn!(execution_id = %context.execution_id, "execution dropped before finishing");
            context.complete(RunStatus::Cancelled, None, Some(CANCELLED.to_string()));
        }

        self.active.lock().remove(&context.execution_id);
        let mut history = self.history.lock();
        history.push_back(context);
        while history.len() > self.history_limit {
            history.pop_front();
        }
    }
}

async fn dispatch(
    capabilities: &[(String, ToolFactory)],
    context: &mut ExecutionContext,
    max_steps: usize,
) -> Dispatch {
    let inputs = Value::Object(context.task.inputs.clone());
    let mut invocations = 0;

    for (name, factory) in capabilities {
        let prepared = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let tool = factory();
            let available = tool.is_available(&context.environment);
            (tool, available)
        }));
        let tool = match prepared {
            Ok((tool, true)) => tool,
            Ok((_, false)) => {
                debug!(execution_id = %context.execution_id, tool = %name, "tool unavailable");
                context
                    .steps
                    .record(StepKind::ToolUnavailable, json!({ "tool": name }));
                continue;
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(execution_id = %context.execution_id, tool = %name, error = %message, "tool panicked before invocation");
                context
                    .steps
                    .record(StepKind::ToolError, json!({ "tool": name, "error": message }));
                continue;
            }
        };

        if invocations >= max_steps {
            warn!(execution_id = %context.execution_id, max_steps, "step limit reached");
            return Dispatch::StepLimit;
        }
        invocations += 1;

        debug!(execution_id = %context.execution_id, tool = %name, "invoking tool");
        context.steps.record(
            StepKind::ToolExecution,
            json!({ "tool": name, "inputs": inputs }),
        );

        let ExecutionContext {
            execution_id,
            steps,
            environment,
            ..
        } = &mut *context;
        match invoke(tool.as_ref(), name, inputs.clone(), environment, steps, execution_id).await {
            Invocation::Result(value) => return Dispatch::Result(value),
            Invocation::Failed => continue,
        }
    }

    Dispatch::Exhausted
}

/// Consume one tool's events until its first result or error.
async fn invoke(
    tool: &dyn Tool,
    name: &str,
    inputs: Value,
    environment: &mut Environment,
    steps: &mut StepLog,
    execution_id: &str,
) -> Invocation {
    let env = &mut *environment;
    let mut stream = match std::panic::catch_unwind(AssertUnwindSafe(move || tool.invoke(env, inputs))) {
        Ok(stream) => stream,
        Err(panic) => return tool_failed(steps, execution_id, name, panic_message(panic.as_ref())),
    };

    let output = loop {
        match AssertUnwindSafe(stream.next()).catch_unwind().await {
            Ok(Some(Event::Status(text))) => {
                debug!(execution_id = %execution_id, tool = %name, status = %text, "tool status");
                steps.record(StepKind::ToolStatus, json!({ "tool": name, "status": text }));
            }
            Ok(Some(Event::Result(output))) => break output,
            Ok(Some(Event::Error(message))) => {
                return tool_failed(steps, execution_id, name, message);
            }
            Ok(None) => {
                return tool_failed(steps, execution_id, name, "Tool produced no result".to_string());
            }
            Err(panic) => return tool_failed(steps, execution_id, name, panic_message(panic.as_ref())),
        }
    };
    drop(stream);

    let value = output
        .first_object()
        .cloned()
        .unwrap_or_else(|| json!({ "message": "No result" }));
    environment.append(name, output.name.clone(), output.to_batch());
    steps.record(
        StepKind::ToolResult,
        json!({
            "tool": name,
            "name": output.name,
            "result": output.first_object(),
            "message": output.render_message(),
        }),
    );
    debug!(execution_id = %execution_id, tool = %name, result = %output.name, "tool produced result");
    Invocation::Result(value)
}

fn tool_failed(steps: &mut StepLog, execution_id: &str, name: &str, message: String) -> Invocation {
    warn!(execution_id = %execution_id, tool = %name, error = %message, "tool failed");
    steps.record(StepKind::ToolError, json!({ "tool": name, "error": message }));
    Invocation::Failed
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("Tool panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("Tool panicked: {}", s)
    } else {
        "Tool panicked".to_string()
    }
}
