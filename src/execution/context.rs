// ABOUTME: ExecutionContext and its parts - the task, the ordered step log and the
// ABOUTME: outcome summaries reported to callers and kept in run history.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use super::RunStatus;
use crate::bus::Message;
use crate::environment::Environment;

/// What an agent is asked to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub objective: String,

    /// Inputs handed to every capability the run tries.
    #[serde(default)]
    pub inputs: Map<String, Value>,

    /// The bus message this task was built from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

impl Task {
    pub fn new(objective: impl Into<String>) -> Self {
        Self {
            objective: objective.into(),
            inputs: Map::new(),
            message: None,
        }
    }

    /// Set all inputs from a JSON object. Non-object values are ignored.
    pub fn with_inputs(mut self, inputs: Value) -> Self {
        if let Value::Object(map) = inputs {
            self.inputs = map;
        }
        self
    }

    /// Set a single input.
    pub fn input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }

    /// Build a task from a bus message: the content is the objective and
    /// `metadata.inputs` (when it is an object) supplies the inputs.
    pub fn from_message(message: &Message) -> Self {
        let inputs = match message.metadata.get("inputs") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        Self {
            objective: message.content.clone(),
            inputs,
            message: Some(message.clone()),
        }
    }
}

/// Kind of an entry in the step log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Start,
    ToolUnavailable,
    ToolExecution,
    ToolStatus,
    ToolResult,
    ToolError,
    Result,
    Completion,
}

/// One entry in the step log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub data: Value,
}

/// Append-only step log whose length is visible to live status queries.
#[derive(Debug, Clone, Default)]
pub struct StepLog {
    steps: Vec<Step>,
    recorded: Arc<AtomicUsize>,
}

impl StepLog {
    pub(crate) fn new(recorded: Arc<AtomicUsize>) -> Self {
        Self {
            steps: Vec::new(),
            recorded,
        }
    }

    pub fn record(&mut self, kind: StepKind, data: Value) {
        self.steps.push(Step {
            timestamp: Utc::now(),
            kind,
            data,
        });
        self.recorded.store(self.steps.len(), Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn as_slice(&self) -> &[Step] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }

    /// Kinds in order; handy for assertions.
    pub fn kinds(&self) -> Vec<StepKind> {
        self.steps.iter().map(|s| s.kind).collect()
    }
}

impl Serialize for StepLog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.steps.serialize(serializer)
    }
}

/// The record of one run of an agent against a task.
///
/// Owned by the executor while the run is live, then moved into history.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionContext {
    pub execution_id: String,
    pub agent: String,
    pub task: Task,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub steps: StepLog,
    pub status: RunStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub environment: Environment,
}

impl ExecutionContext {
    /// Create a context for `agent`, counting steps into `recorded`.
    pub(crate) fn new(
        agent: &str,
        task: Task,
        environment: Environment,
        recorded: Arc<AtomicUsize>,
    ) -> Self {
        let started_at = Utc::now();
        Self {
            execution_id: execution_id(agent, started_at),
            agent: agent.to_string(),
            task,
            started_at,
            ended_at: None,
            steps: StepLog::new(recorded),
            status: RunStatus::Created,
            result: None,
            error: None,
            environment,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Seconds from start to end, or to now while running.
    pub fn duration_seconds(&self) -> f64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// Close the context with its final status and record a completion step.
    pub(crate) fn complete(&mut self, status: RunStatus, result: Option<Value>, error: Option<String>) {
        self.ended_at = Some(Utc::now());
        self.status = status;
        let duration = self.duration_seconds();
        self.steps.record(
            StepKind::Completion,
            json!({
                "success": status == RunStatus::Completed,
                "result": result.clone().or_else(|| error.clone().map(Value::String)),
                "duration": duration,
            }),
        );
        self.result = result;
        self.error = error;
    }

    pub fn outcome(&self) -> RunOutcome {
        RunOutcome {
            execution_id: self.execution_id.clone(),
            status: self.status,
            result: self.result.clone(),
            error: self.error.clone(),
            steps: self.steps.len(),
            duration_seconds: self.duration_seconds(),
        }
    }

    pub fn summary(&self) -> ExecutionSummary {
        ExecutionSummary {
            execution_id: self.execution_id.clone(),
            agent: self.agent.clone(),
            status: self.status,
            steps: self.steps.len(),
            duration_seconds: self.ended_at.map(|_| self.duration_seconds()),
        }
    }
}

// Agent name and creation second, plus a short random suffix so runs started
// in the same second stay distinct.
fn execution_id(agent: &str, at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", agent, at.timestamp(), &suffix[..8])
}

/// What a caller gets back from a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub execution_id: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub steps: usize,
    pub duration_seconds: f64,
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// One row of run history, or the live view of an active run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub execution_id: String,
    pub agent: String,
    pub status: RunStatus,
    pub steps: usize,
    /// `None` while the run is still live.
    pub duration_seconds: Option<f64>,
}
