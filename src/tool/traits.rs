// ABOUTME: Defines the Tool trait - the contract every agent capability satisfies.
// ABOUTME: Tools declare inputs and availability and produce an ordered event stream.

use std::pin::Pin;

use futures::Stream;

use super::{Event, InputSchema};
use crate::environment::Environment;

/// Ordered, lazily produced events from one tool invocation.
pub type EventStream<'a> = Pin<Box<dyn Stream<Item = Event> + Send + 'a>>;

/// A capability that can be invoked by an agent.
///
/// A fresh instance is built for every invocation (see
/// [`ToolRegistry`](super::ToolRegistry)), so implementations should not rely
/// on state carried between calls. Failures are reported by yielding
/// [`Event::Error`] and ending the stream, never by panicking.
pub trait Tool: Send + Sync {
    /// Returns the unique name of this tool.
    fn name(&self) -> &str;

    /// Returns a human-readable description.
    fn description(&self) -> &str;

    /// Returns the declared input fields.
    fn inputs(&self) -> InputSchema {
        InputSchema::default()
    }

    /// Whether a successful result should end the enclosing decision process.
    fn ends_run(&self) -> bool {
        false
    }

    /// Whether the tool can run against the given environment.
    ///
    /// Must be free of side effects.
    fn is_available(&self, _env: &Environment) -> bool {
        true
    }

    /// Invoke the tool. Events must be consumed in the order they are yielded.
    fn invoke<'a>(&'a self, env: &'a mut Environment, inputs: serde_json::Value) -> EventStream<'a>;
}
