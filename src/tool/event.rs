// ABOUTME: Defines Event and ToolOutput - the tagged values a tool invocation
// ABOUTME: yields, with message templates rendered from result metadata.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::environment::ResultBatch;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// One event produced by a tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Progress text; never ends the invocation.
    Status(String),

    /// A successful result.
    Result(ToolOutput),

    /// A failure; the invocation ends here.
    Error(String),
}

impl Event {
    /// Create a status event.
    pub fn status(text: impl Into<String>) -> Self {
        Self::Status(text.into())
    }

    /// Create an error event.
    pub fn error(text: impl Into<String>) -> Self {
        Self::Error(text.into())
    }

    /// Short name of the variant, used in step logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Result(_) => "result",
            Self::Error(_) => "error",
        }
    }
}

impl From<ToolOutput> for Event {
    fn from(output: ToolOutput) -> Self {
        Self::Result(output)
    }
}

/// Payload of a successful tool result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Result objects; the first one becomes a run's result.
    pub objects: Vec<Value>,

    /// Structured data about the result.
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Name the result is stored under in the environment.
    pub name: String,

    /// Message template; `{key}` placeholders are filled by [`render_message`](Self::render_message).
    #[serde(default)]
    pub message: String,
}

impl ToolOutput {
    /// Create a result with the given name and objects.
    pub fn new(name: impl Into<String>, objects: Vec<Value>) -> Self {
        Self {
            objects,
            metadata: Map::new(),
            name: name.into(),
            message: String::new(),
        }
    }

    /// Add metadata to the result.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.metadata.insert(key.into(), v);
        }
        self
    }

    /// Set the message template.
    pub fn with_message(mut self, template: impl Into<String>) -> Self {
        self.message = template.into();
        self
    }

    pub fn first_object(&self) -> Option<&Value> {
        self.objects.first()
    }

    /// Fill `{key}` placeholders from metadata, then from the first object.
    ///
    /// Unknown placeholders are left untouched.
    pub fn render_message(&self) -> String {
        let first = self.first_object().and_then(Value::as_object);
        PLACEHOLDER
            .replace_all(&self.message, |caps: &Captures<'_>| {
                let key = &caps[1];
                match self.metadata.get(key).or_else(|| first.and_then(|o| o.get(key))) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Convert into a batch for storage in the environment.
    pub fn to_batch(&self) -> ResultBatch {
        ResultBatch::new(self.objects.clone()).with_metadata(self.metadata.clone())
    }
}
