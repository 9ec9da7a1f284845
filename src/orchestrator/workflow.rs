// ABOUTME: Collaborative workflows - named sequences of coordinated tasks run one
// ABOUTME: step at a time through a MultiAgentOrchestrator.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use super::{CoordinatedTaskResult, MultiAgentOrchestrator};
use crate::error::WorkflowError;

/// One step of a workflow: a coordinated task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub name: String,
    pub description: String,
    /// Participants of the step's coordinated task.
    pub agents: Vec<String>,
    pub coordinator: String,
}

impl WorkflowStep {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        coordinator: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            agents: Vec::new(),
            coordinator: coordinator.into(),
        }
    }

    /// Set the participants.
    pub fn agents<I, S>(mut self, agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.agents = agents.into_iter().map(Into::into).collect();
        self
    }
}

/// A named, ordered list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub steps: Vec<WorkflowStep>,
    pub agents: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: String,
    pub results: CoordinatedTaskResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub workflow: String,
    pub completed_steps: Vec<StepResult>,
    pub completed_at: DateTime<Utc>,
}

/// Stores workflows and runs them step by step.
pub struct AgentCollaboration {
    orchestrator: MultiAgentOrchestrator,
    workflows: Arc<RwLock<HashMap<String, Workflow>>>,
}

impl AgentCollaboration {
    pub fn new(orchestrator: MultiAgentOrchestrator) -> Self {
        Self {
            orchestrator,
            workflows: Arc::default(),
        }
    }

    pub fn orchestrator(&self) -> &MultiAgentOrchestrator {
        &self.orchestrator
    }

    /// Define or replace a workflow.
    pub async fn define_workflow<I, S>(
        &self,
        name: &str,
        steps: Vec<WorkflowStep>,
        agents: I,
    ) -> Workflow
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let workflow = Workflow {
            name: name.to_string(),
            steps,
            agents: agents.into_iter().map(Into::into).collect(),
            created_at: Utc::now(),
        };
        self.workflows
            .write()
            .await
            .insert(name.to_string(), workflow.clone());
        workflow
    }

    pub async fn workflow(&self, name: &str) -> Option<Workflow> {
        self.workflows.read().await.get(name).cloned()
    }

    /// Names of defined workflows, sorted.
    pub async fn list(&self) -> Vec<String> {
        let workflows = self.workflows.read().await;
        let mut names: Vec<String> = workflows.keys().cloned().collect();
        names.sort();
        names
    }

    /// Run each step's coordinated task in order.
    ///
    /// A step that times out still counts as completed; its result says so.
    pub async fn execute_workflow(&self, name: &str) -> Result<WorkflowResult, WorkflowError> {
        let workflow = self
            .workflow(name)
            .await
            .ok_or_else(|| WorkflowError::NotFound(name.to_string()))?;

        let mut completed_steps = Vec::with_capacity(workflow.steps.len());
        for step in &workflow.steps {
            info!(workflow = %name, step = %step.name, "running workflow step");
            let results = self
                .orchestrator
                .execute_coordinated_task(&step.description, &step.agents, &step.coordinator)
                .await
                .map_err(|source| WorkflowError::Step {
                    step: step.name.clone(),
                    source,
                })?;
            completed_steps.push(StepResult {
                step: step.name.clone(),
                results,
            });
        }

        Ok(WorkflowResult {
            workflow: name.to_string(),
            completed_steps,
            completed_at: Utc::now(),
        })
    }
}
