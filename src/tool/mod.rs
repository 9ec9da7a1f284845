// ABOUTME: Tool module - the capability contract, events, input schemas, and registry.
// ABOUTME: Core abstraction for what an agent can do against the environment.

mod event;
mod registry;
mod schema;
mod traits;

pub use event::*;
pub use registry::*;
pub use schema::*;
pub use traits::*;

#[cfg(test)]
mod event_test;
#[cfg(test)]
mod registry_test;
#[cfg(test)]
mod schema_test;
