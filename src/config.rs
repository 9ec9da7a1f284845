// ABOUTME: Runtime configuration - timeouts and limits shared by the executor
// ABOUTME: and orchestrator, loadable from TOML with per-field defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for running agents.
///
/// Every field has a default, so a TOML file only needs to name the values it
/// overrides:
///
/// ```toml
/// run_timeout_secs = 60
/// coordination_timeout_secs = 2.5
/// ```
///
/// Timeouts are seconds and may be fractional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Deadline for one agent run, covering every capability it tries.
    pub run_timeout_secs: f64,

    /// Maximum number of capability invocations in one run.
    pub max_steps: usize,

    /// How long a coordinated task waits for participant responses.
    pub coordination_timeout_secs: f64,

    /// Number of finished runs kept in the executor history.
    pub history_limit: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            run_timeout_secs: 300.0,
            max_steps: 50,
            coordination_timeout_secs: 30.0,
            history_limit: 1000,
        }
    }
}

impl RuntimeConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML text.
    ///
    /// Negative, NaN and infinite timeouts are rejected.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that both timeouts are finite and not negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("run_timeout_secs", self.run_timeout_secs),
            ("coordination_timeout_secs", self.coordination_timeout_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidTimeout { field, value });
            }
        }
        Ok(())
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Set the run timeout.
    pub fn run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout_secs = timeout.as_secs_f64();
        self
    }

    /// Set the maximum capability invocations per run.
    pub fn max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }

    /// Set the coordinated-task timeout.
    pub fn coordination_timeout(mut self, timeout: Duration) -> Self {
        self.coordination_timeout_secs = timeout.as_secs_f64();
        self
    }

    /// Set the history capacity.
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn run_timeout_duration(&self) -> Duration {
        seconds(self.run_timeout_secs)
    }

    pub fn coordination_timeout_duration(&self) -> Duration {
        seconds(self.coordination_timeout_secs)
    }
}

// Out-of-range values set directly on the fields saturate.
fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}
