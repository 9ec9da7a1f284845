// ABOUTME: Root module for relay - agents, capabilities and multi-agent messaging.
// ABOUTME: Re-exports all public types from submodules.

pub mod agent;
pub mod bus;
pub mod config;
pub mod environment;
pub mod error;
pub mod execution;
pub mod orchestrator;
pub mod prelude;
pub mod search;
pub mod tool;
pub mod tools;

pub use error::RelayError;
