// ABOUTME: Input schema types - declared fields with type, description,
// ABOUTME: required flag, and default, plus the shared resolve/validate helper.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ToolError;

/// Declared type of an input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    String,
    Integer,
    Number,
    Boolean,
    List,
    Object,
    Any,
}

impl InputType {
    /// Whether `value` has this type. Integers count as numbers.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::List => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::List => "list",
            Self::Object => "object",
            Self::Any => "any",
        }
    }
}

/// One declared input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputField {
    #[serde(rename = "type")]
    pub kind: InputType,
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl InputField {
    /// Create an optional field.
    pub fn new(kind: InputType, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            required: false,
            default: None,
        }
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value used when the field is absent.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Mapping of field name to declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputSchema {
    fields: BTreeMap<String, InputField>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field.
    pub fn field(mut self, name: impl Into<String>, field: InputField) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    pub fn get(&self, name: &str) -> Option<&InputField> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &BTreeMap<String, InputField> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate `inputs` against the schema.
    ///
    /// Absent or null fields take their default; a required field with neither
    /// a value nor a default is rejected, as is a value of the wrong type.
    /// Undeclared keys pass through unchanged.
    pub fn resolve(&self, inputs: &Value) -> Result<Map<String, Value>, ToolError> {
        let mut resolved = match inputs {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(ToolError::InvalidInput(format!(
                    "inputs must be an object, got {}",
                    other
                )));
            }
        };

        for (name, field) in &self.fields {
            match resolved.get(name) {
                Some(value) if !value.is_null() => {
                    if !field.kind.matches(value) {
                        return Err(ToolError::InvalidInput(format!(
                            "input '{}' must be of type {}",
                            name,
                            field.kind.as_str()
                        )));
                    }
                }
                _ => match &field.default {
                    Some(default) => {
                        resolved.insert(name.clone(), default.clone());
                    }
                    None if field.required => {
                        return Err(ToolError::InvalidInput(format!(
                            "missing required input '{}'",
                            name
                        )));
                    }
                    None => {}
                },
            }
        }

        Ok(resolved)
    }
}
