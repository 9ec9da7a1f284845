// ABOUTME: Message bus module - agent-to-agent messages and their delivery.
// ABOUTME: Provides Message, MessageFilter and the mailbox-based MessageBus.

mod message;
mod router;

pub use message::{Message, MessageFilter, MessageType};
pub use router::{Mailbox, MessageBus, Subscription};
