// ABOUTME: Message types exchanged between agents - Message, MessageType and
// ABOUTME: MessageFilter for selecting messages from history or live traffic.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Kind of a bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Task,
    Response,
    Error,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageType::Text => write!(f, "text"),
            MessageType::Task => write!(f, "task"),
            MessageType::Response => write!(f, "response"),
            MessageType::Error => write!(f, "error"),
        }
    }
}

/// A message between agents. Immutable once sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub content: String,
    pub message_type: MessageType,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        content: impl Into<String>,
        message_type: MessageType,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: sender.into(),
            recipient: recipient.into(),
            content: content.into(),
            message_type,
            metadata: Map::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a plain text message.
    pub fn text(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(sender, recipient, content, MessageType::Text)
    }

    /// Add one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.metadata.insert(key.into(), v);
        }
        self
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// True if `agent` sent or receives this message.
    pub fn involves(&self, agent: &str) -> bool {
        self.sender == agent || self.recipient == agent
    }
}

/// Selects messages by sender, recipient, participant and type.
///
/// Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageFilter {
    senders: Option<HashSet<String>>,
    recipient: Option<String>,
    agent: Option<String>,
    message_type: Option<MessageType>,
}

impl MessageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match messages from this sender. Adds to any senders already set.
    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.senders
            .get_or_insert_with(HashSet::new)
            .insert(sender.into());
        self
    }

    /// Match messages from any of these senders.
    pub fn senders<I, S>(mut self, senders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.senders
            .get_or_insert_with(HashSet::new)
            .extend(senders.into_iter().map(Into::into));
        self
    }

    pub fn recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    /// Match messages that `agent` sent or receives.
    pub fn involving(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn message_type(mut self, message_type: MessageType) -> Self {
        self.message_type = Some(message_type);
        self
    }

    pub fn matches(&self, message: &Message) -> bool {
        self.senders
            .as_ref()
            .is_none_or(|senders| senders.contains(&message.sender))
            && self
                .recipient
                .as_ref()
                .is_none_or(|recipient| &message.recipient == recipient)
            && self.agent.as_ref().is_none_or(|agent| message.involves(agent))
            && self
                .message_type
                .is_none_or(|message_type| message.message_type == message_type)
    }
}
