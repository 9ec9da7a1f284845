// ABOUTME: Defines all error types for the relay library using thiserror.
// ABOUTME: Each submodule has its own error enum, unified under RelayError.

/// Top-level error type for the relay library.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors that abort a call to the executor before a run exists.
///
/// Everything that happens once a run has started (timeouts, capability
/// failures, cancellation) is reported through `RunOutcome` instead.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Agent '{0}' not found")]
    AgentNotFound(String),
}

/// Errors from tool operations.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Errors from message bus and orchestrator operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Agent '{0}' not found")]
    AgentNotFound(String),
}

/// Errors from collaborative workflows.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Workflow '{0}' not found")]
    NotFound(String),

    #[error("Workflow step '{step}' failed: {source}")]
    Step {
        step: String,
        #[source]
        source: BusError,
    },
}

/// Errors from loading runtime configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {field}: {value} (must be a finite number of seconds, not negative)")]
    InvalidTimeout { field: &'static str, value: f64 },
}
