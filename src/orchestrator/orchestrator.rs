// ABOUTME: MultiAgentOrchestrator - starts agent message loops on the bus and runs
// ABOUTME: coordinated tasks that wait for every participant to answer.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bus::{Message, MessageBus, MessageFilter, MessageType};
use crate::error::BusError;
use crate::execution::{AgentExecutor, Task};

/// Callback run for every sent message of a registered type.
pub type MessageHandler = Arc<dyn Fn(&Message) + Send + Sync>;

/// Sender name used for messages the orchestrator itself sends.
pub const SYSTEM_SENDER: &str = "system";

// Stand-in deadline for timeouts too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Outcome of a coordinated task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatedTaskResult {
    pub task: String,
    pub coordinator: String,
    pub participants: Vec<String>,
    /// Participant messages to the coordinator, in arrival order.
    pub responses: Vec<Message>,
    pub completed_at: DateTime<Utc>,
    /// True if the deadline passed before every participant answered.
    pub timed_out: bool,
}

struct AgentLoop {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Sends messages and runs the handlers registered for their type.
#[derive(Clone, Default)]
struct Outbox {
    bus: MessageBus,
    handlers: Arc<RwLock<HashMap<MessageType, Vec<MessageHandler>>>>,
}

impl Outbox {
    fn send(&self, message: Message) {
        let handlers = self
            .handlers
            .read()
            .get(&message.message_type)
            .cloned()
            .unwrap_or_default();
        self.bus.send(message.clone());
        for handler in handlers {
            handler(&message);
        }
    }
}

/// Runs agents as message-driven participants on a shared [`MessageBus`].
///
/// Each started agent gets one loop that takes messages from its mailbox,
/// runs the shared executor on them and answers the sender. Cloning is cheap;
/// clones control the same agents.
pub struct MultiAgentOrchestrator {
    executor: AgentExecutor,
    outbox: Outbox,
    active: Arc<Mutex<HashMap<String, AgentLoop>>>,
    coordination_timeout: Duration,
}

impl MultiAgentOrchestrator {
    pub fn new(executor: AgentExecutor) -> Self {
        Self::with_bus(executor, MessageBus::new())
    }

    /// Create an orchestrator on an existing bus.
    ///
    /// Replies addressed to [`SYSTEM_SENDER`] are kept in history but never
    /// queued, since nothing consumes them.
    pub fn with_bus(executor: AgentExecutor, bus: MessageBus) -> Self {
        bus.stop_queueing(SYSTEM_SENDER);
        let coordination_timeout = executor.config().coordination_timeout_duration();
        Self {
            executor,
            outbox: Outbox {
                bus,
                handlers: Arc::default(),
            },
            active: Arc::default(),
            coordination_timeout,
        }
    }

    pub fn bus(&self) -> &MessageBus {
        &self.outbox.bus
    }

    pub fn executor(&self) -> &AgentExecutor {
        &self.executor
    }

    /// Start consuming `agent`'s mailbox.
    ///
    /// Returns `Ok(false)` if the agent is already running.
    pub async fn start_agent(&self, agent: &str) -> Result<bool, BusError> {
        if self.executor.agents().get(agent).await.is_none() {
            return Err(BusError::AgentNotFound(agent.to_string()));
        }

        let mut active = self.active.lock();
        if active.contains_key(agent) {
            return Ok(false);
        }

        let (stop, stop_rx) = watch::channel(false);
        let task = tokio::spawn(agent_loop(
            agent.to_string(),
            self.executor.clone(),
            self.outbox.clone(),
            stop_rx,
        ));
        active.insert(agent.to_string(), AgentLoop { stop, task });
        info!(agent = %agent, "agent started");
        Ok(true)
    }

    /// Stop `agent`'s loop after the message it is handling, if any.
    ///
    /// Returns false if the agent was not running.
    pub fn stop_agent(&self, agent: &str) -> bool {
        let Some(agent_loop) = self.active.lock().remove(agent) else {
            return false;
        };
        let _ = agent_loop.stop.send(true);
        info!(agent = %agent, "agent stopped");
        true
    }

    pub fn is_active(&self, agent: &str) -> bool {
        self.active.lock().contains_key(agent)
    }

    /// Names of running agents, sorted.
    pub fn active_agents(&self) -> Vec<String> {
        let mut names: Vec<String> = self.active.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Send a message and run the handlers registered for its type.
    pub fn send_message(&self, message: Message) {
        debug!(
            sender = %message.sender,
            recipient = %message.recipient,
            message_type = %message.message_type,
            "sending message"
        );
        self.outbox.send(message);
    }

    /// Send `content` to every running agent except `sender`.
    ///
    /// Returns the number of messages sent.
    pub fn broadcast_message(
        &self,
        sender: &str,
        content: &str,
        message_type: MessageType,
    ) -> usize {
        let recipients: Vec<String> = self
            .active_agents()
            .into_iter()
            .filter(|name| name != sender)
            .collect();
        for recipient in &recipients {
            self.send_message(Message::new(sender, recipient, content, message_type));
        }
        recipients.len()
    }

    /// Register a callback for every message of `message_type` sent from now on.
    pub fn register_message_handler<F>(&self, message_type: MessageType, handler: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.outbox
            .handlers
            .write()
            .entry(message_type)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Messages in send order, optionally filtered.
    pub fn conversation_history(&self, filter: Option<&MessageFilter>) -> Vec<Message> {
        self.outbox.bus.history(filter)
    }

    /// Run a coordinated task with the configured timeout.
    pub async fn execute_coordinated_task<I, S>(
        &self,
        task: &str,
        participants: I,
        coordinator: &str,
    ) -> Result<CoordinatedTaskResult, BusError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.execute_coordinated_task_with_timeout(
            task,
            participants,
            coordinator,
            self.coordination_timeout,
        )
        .await
    }

    /// Hand `task` to `coordinator` and wait until every participant has
    /// messaged the coordinator or `timeout` passes.
    ///
    /// Participants are started for the task and stopped afterwards. Running
    /// out of time is reported in the result, not as an error.
    pub async fn execute_coordinated_task_with_timeout<I, S>(
        &self,
        task: &str,
        participants: I,
        coordinator: &str,
        timeout: Duration,
    ) -> Result<CoordinatedTaskResult, BusError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let participants: Vec<String> = participants.into_iter().map(Into::into).collect();
        let now = tokio::time::Instant::now();
        let deadline = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);

        // Subscribe before anything can answer.
        let mut responses_feed = self.outbox.bus.subscribe(
            MessageFilter::new()
                .senders(participants.iter().cloned())
                .recipient(coordinator),
        );

        for (started, participant) in participants.iter().enumerate() {
            if let Err(e) = self.start_agent(participant).await {
                for earlier in &participants[..started] {
                    self.stop_agent(earlier);
                }
                return Err(e);
            }
        }

        info!(coordinator = %coordinator, participants = ?participants, "coordinated task started");
        let request = Message::new(
            SYSTEM_SENDER,
            coordinator,
            format!("Coordinate the following task: {}", task),
            MessageType::Task,
        )
        .with_metadata("task_type", "coordination")
        .with_metadata("participants", &participants);
        let request_id = request.id.clone();
        self.send_message(request);

        let expected: HashSet<&str> = participants.iter().map(String::as_str).collect();
        let mut seen: HashSet<String> = HashSet::new();
        let mut responses = Vec::new();
        let timed_out = loop {
            if expected.iter().all(|p| seen.contains(*p)) {
                break false;
            }
            match tokio::time::timeout_at(deadline, responses_feed.recv()).await {
                Ok(Some(message)) => {
                    seen.insert(message.sender.clone());
                    responses.push(message);
                }
                Ok(None) | Err(_) => break true,
            }
        };

        if timed_out {
            warn!(
                coordinator = %coordinator,
                received = responses.len(),
                expected = expected.len(),
                "coordinated task timed out"
            );
        }
        for participant in &participants {
            self.stop_agent(participant);
        }
        // Without a running loop the coordinator's mailbox would keep this
        // task's mail and replay it to a later consumer.
        self.outbox.bus.discard(coordinator, |message| {
            message.id == request_id || expected.contains(message.sender.as_str())
        });

        Ok(CoordinatedTaskResult {
            task: task.to_string(),
            coordinator: coordinator.to_string(),
            participants,
            responses,
            completed_at: Utc::now(),
            timed_out,
        })
    }

    /// Stop every agent, wait for their loops to exit and drop queued messages.
    pub async fn shutdown(&self) {
        let loops: Vec<(String, AgentLoop)> = self.active.lock().drain().collect();
        for (agent, agent_loop) in loops {
            let _ = agent_loop.stop.send(true);
            if let Err(e) = agent_loop.task.await {
                warn!(agent = %agent, error = %e, "agent loop ended abnormally");
            }
        }
        self.outbox.bus.clear();
        info!("orchestrator shut down");
    }
}

impl Clone for MultiAgentOrchestrator {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            outbox: self.outbox.clone(),
            active: Arc::clone(&self.active),
            coordination_timeout: self.coordination_timeout,
        }
    }
}

async fn agent_loop(
    agent: String,
    executor: AgentExecutor,
    outbox: Outbox,
    mut stop: watch::Receiver<bool>,
) {
    let mailbox = outbox.bus.mailbox(&agent);
    // A previous loop for the same agent may still hold the mailbox.
    let mut receiver = tokio::select! {
        biased;
        _ = stop.changed() => return,
        receiver = mailbox.lock() => receiver,
    };
    debug!(agent = %agent, "agent loop running");

    loop {
        let message = tokio::select! {
            biased;
            _ = stop.changed() => break,
            message = receiver.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };
        handle_message(&agent, &executor, &outbox, message).await;
    }
    debug!(agent = %agent, "agent loop exited");
}

async fn handle_message(agent: &str, executor: &AgentExecutor, outbox: &Outbox, message: Message) {
    // Replies are not answered, so two running agents never ping-pong.
    if matches!(message.message_type, MessageType::Response | MessageType::Error) {
        debug!(agent = %agent, sender = %message.sender, message_type = %message.message_type, "received reply");
        return;
    }

    debug!(agent = %agent, sender = %message.sender, id = %message.id, "handling message");
    let reply = match executor.run_task(agent, Task::from_message(&message)).await {
        Ok(outcome) => {
            let content = match &outcome.result {
                Some(Value::String(text)) => text.clone(),
                Some(value) => value.to_string(),
                None => "Message processed".to_string(),
            };
            Message::new(agent, &message.sender, content, MessageType::Response)
                .with_metadata("original_message_id", &message.id)
                .with_metadata("execution_id", &outcome.execution_id)
                .with_metadata("status", outcome.status)
        }
        Err(e) => {
            warn!(agent = %agent, error = %e, "message processing failed");
            Message::new(
                SYSTEM_SENDER,
                &message.sender,
                format!("Error processing message: {}", e),
                MessageType::Error,
            )
            .with_metadata("original_message_id", &message.id)
        }
    };
    outbox.send(reply);
}
