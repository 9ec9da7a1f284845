// ABOUTME: MessageBus - per-recipient mailboxes, filtered observer fan-out and a
// ABOUTME: send-ordered conversation history shared by all clones.

use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::{Message, MessageFilter};

/// Receiving end of one recipient's mailbox.
///
/// The lock makes each mailbox single-consumer: whoever holds it is the only
/// reader until it is released.
pub type Mailbox = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Message>>>;

struct Slot {
    sender: mpsc::UnboundedSender<Message>,
    receiver: Mailbox,
}

impl Slot {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
        }
    }
}

struct Observer {
    filter: MessageFilter,
    sender: mpsc::UnboundedSender<Message>,
}

#[derive(Default)]
struct Inner {
    mailboxes: Mutex<HashMap<String, Slot>>,
    unqueued: Mutex<HashSet<String>>,
    observers: Mutex<Vec<Observer>>,
    history: Mutex<Vec<Message>>,
}

/// Routes messages to recipients.
///
/// Every message lands in exactly one mailbox, the one named by its
/// recipient. Observers registered with [`subscribe`](Self::subscribe) get
/// their own copy of matching messages and never take anything out of a
/// mailbox.
#[derive(Clone, Default)]
pub struct MessageBus {
    inner: Arc<Inner>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` in history, deliver it and copy it to observers.
    pub fn send(&self, message: Message) {
        // History order is delivery order, so both happen under one lock.
        let mut history = self.inner.history.lock();
        trace!(id = %message.id, sender = %message.sender, recipient = %message.recipient, "send");

        {
            let mut mailboxes = self.inner.mailboxes.lock();
            if self.inner.unqueued.lock().contains(&message.recipient) {
                trace!(recipient = %message.recipient, "recipient not queued");
            } else {
                let slot = mailboxes
                    .entry(message.recipient.clone())
                    .or_insert_with(Slot::new);
                if slot.sender.send(message.clone()).is_err() {
                    debug!(recipient = %message.recipient, "mailbox closed, message dropped");
                }
            }
        }

        {
            let mut observers = self.inner.observers.lock();
            observers.retain(|observer| !observer.sender.is_closed());
            for observer in observers.iter() {
                if observer.filter.matches(&message) {
                    let _ = observer.sender.send(message.clone());
                }
            }
        }

        history.push(message);
    }

    /// The mailbox for `recipient`, created on first use.
    pub fn mailbox(&self, recipient: &str) -> Mailbox {
        let mut mailboxes = self.inner.mailboxes.lock();
        let slot = mailboxes
            .entry(recipient.to_string())
            .or_insert_with(Slot::new);
        Arc::clone(&slot.receiver)
    }

    /// Take the next message for `recipient`, waiting up to `timeout`.
    ///
    /// Waits behind any other consumer currently holding the mailbox.
    pub async fn recv_timeout(&self, recipient: &str, timeout: Duration) -> Option<Message> {
        let mailbox = self.mailbox(recipient);
        tokio::time::timeout(timeout, async move {
            let mut receiver = mailbox.lock().await;
            receiver.recv().await
        })
        .await
        .ok()
        .flatten()
    }

    /// Observe every message matching `filter` sent from now on.
    pub fn subscribe(&self, filter: MessageFilter) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner.observers.lock().push(Observer { filter, sender });
        Subscription { receiver }
    }

    /// Messages in send order, optionally filtered.
    pub fn history(&self, filter: Option<&MessageFilter>) -> Vec<Message> {
        let history = self.inner.history.lock();
        history
            .iter()
            .filter(|message| filter.is_none_or(|f| f.matches(message)))
            .cloned()
            .collect()
    }

    /// Stop queueing messages addressed to `recipient`.
    ///
    /// They are still recorded in history and copied to observers. Anything
    /// already queued for `recipient` is dropped.
    pub fn stop_queueing(&self, recipient: &str) {
        let mut mailboxes = self.inner.mailboxes.lock();
        self.inner.unqueued.lock().insert(recipient.to_string());
        mailboxes.remove(recipient);
    }

    /// Drop queued messages for `recipient` that match `predicate`, keeping
    /// the rest in order. Returns how many were dropped.
    ///
    /// A mailbox held by a consumer is left alone. An emptied mailbox that
    /// nobody else references is forgotten.
    pub fn discard<F>(&self, recipient: &str, predicate: F) -> usize
    where
        F: Fn(&Message) -> bool,
    {
        let mut mailboxes = self.inner.mailboxes.lock();
        let Some(slot) = mailboxes.get(recipient) else {
            return 0;
        };
        let Ok(mut receiver) = slot.receiver.try_lock() else {
            return 0;
        };

        let mut dropped = 0;
        let mut kept = Vec::new();
        while let Ok(message) = receiver.try_recv() {
            if predicate(&message) {
                dropped += 1;
            } else {
                kept.push(message);
            }
        }
        let idle = kept.is_empty() && Arc::strong_count(&slot.receiver) == 1;
        for message in kept {
            let _ = slot.sender.send(message);
        }
        drop(receiver);

        if idle {
            mailboxes.remove(recipient);
        }
        if dropped > 0 {
            debug!(recipient = %recipient, dropped, "discarded queued messages");
        }
        dropped
    }

    /// Drop everything still queued in mailboxes. History is kept.
    ///
    /// A mailbox held by a waiting consumer is already empty and is skipped.
    pub fn clear(&self) {
        let mailboxes = self.inner.mailboxes.lock();
        let mut dropped = 0;
        for slot in mailboxes.values() {
            if let Ok(mut receiver) = slot.receiver.try_lock() {
                while receiver.try_recv().is_ok() {
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            debug!(dropped, "cleared queued messages");
        }
    }
}

/// A live feed of messages matching a filter.
///
/// Dropping the subscription unregisters it.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Message>,
}

impl Subscription {
    /// Wait for the next matching message.
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// Take a matching message if one is already waiting.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = Message;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        self.receiver.poll_recv(cx)
    }
}
