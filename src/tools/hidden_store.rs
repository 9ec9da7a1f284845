// ABOUTME: Hidden store tools - a writer that stores key/value pairs in the hidden
// ABOUTME: environment and a reader that is only available once the unlock key exists.

use serde_json::{Value, json};

use crate::environment::Environment;
use crate::tool::{Event, EventStream, InputField, InputSchema, InputType, Tool, ToolOutput};

/// Hidden key that makes [`HiddenStoreReaderTool`] available.
pub const UNLOCK_KEY: &str = "unlock";

/// Tool that persists a key/value pair into the hidden environment.
#[derive(Default)]
pub struct HiddenStoreWriterTool;

impl Tool for HiddenStoreWriterTool {
    fn name(&self) -> &str {
        "hidden_store_writer"
    }

    fn description(&self) -> &str {
        "Persist a key/value pair into the hidden environment store."
    }

    fn inputs(&self) -> InputSchema {
        InputSchema::new()
            .field(
                "key",
                InputField::new(InputType::String, "Key to store").required(),
            )
            .field(
                "value",
                InputField::new(InputType::String, "Value to store").required(),
            )
    }

    fn invoke<'a>(&'a self, env: &'a mut Environment, inputs: Value) -> EventStream<'a> {
        Box::pin(async_stream::stream! {
            let inputs = match self.inputs().resolve(&inputs) {
                Ok(inputs) => inputs,
                Err(e) => {
                    yield Event::error(e.to_string());
                    return;
                }
            };
            let key = inputs["key"].as_str().unwrap_or_default().to_string();
            let value = inputs["value"].clone();

            env.set_hidden(key.clone(), value.clone());
            yield Event::status(format!("Stored hidden key '{}'.", key));

            let output = ToolOutput::new(
                "hidden_store_write",
                vec![json!({"stored_key": key, "stored_value": value})],
            )
            .with_metadata("hidden_count", env.hidden().len())
            .with_message("Stored hidden key; total hidden entries now {hidden_count}.");
            yield Event::Result(output);
        })
    }
}

/// Tool that reads the unlock value; only available when it is present.
#[derive(Default)]
pub struct HiddenStoreReaderTool;

impl Tool for HiddenStoreReaderTool {
    fn name(&self) -> &str {
        "hidden_store_reader"
    }

    fn description(&self) -> &str {
        "Conditionally available tool that reads a hidden environment key and returns \
         its value if present. Requires that 'unlock' key exists."
    }

    fn ends_run(&self) -> bool {
        true
    }

    fn is_available(&self, env: &Environment) -> bool {
        env.contains_hidden(UNLOCK_KEY)
    }

    fn invoke<'a>(&'a self, env: &'a mut Environment, _inputs: Value) -> EventStream<'a> {
        Box::pin(async_stream::stream! {
            let value = match env.get_hidden(UNLOCK_KEY) {
                Some(value) => value.clone(),
                None => {
                    yield Event::error(format!("Hidden key '{}' not present.", UNLOCK_KEY));
                    return;
                }
            };

            yield Event::status("Retrieved hidden unlock value.");
            let keys: Vec<&String> = env.hidden().keys().collect();
            let output = ToolOutput::new("hidden_store_read", vec![json!({"unlock": value})])
                .with_metadata("available_keys", keys)
                .with_message("Unlock value retrieved; keys available: {available_keys}.");
            yield Event::Result(output);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_writer_stores_hidden_value() {
        let mut env = Environment::new();
        let tool = HiddenStoreWriterTool;
        let events: Vec<Event> = tool
            .invoke(&mut env, json!({"key": "unlock", "value": "open sesame"}))
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        match &events[1] {
            Event::Result(output) => {
                assert_eq!(output.objects[0]["stored_key"], "unlock");
                assert_eq!(output.metadata["hidden_count"], 1);
            }
            other => panic!("Expected Result, got {:?}", other),
        }
        assert_eq!(env.get_hidden("unlock"), Some(&json!("open sesame")));
        assert!(env.summary().is_empty());
    }

    #[tokio::test]
    async fn test_writer_rejects_missing_value() {
        let mut env = Environment::new();
        let tool = HiddenStoreWriterTool;
        let events: Vec<Event> = tool.invoke(&mut env, json!({"key": "k"})).collect().await;

        assert!(matches!(&events[..], [Event::Error(m)] if m.contains("value")));
        assert!(env.hidden().is_empty());
    }

    #[test]
    fn test_reader_availability_tracks_unlock_key() {
        let tool = HiddenStoreReaderTool;
        let hidden_contents: [&[(&str, &str)]; 5] = [
            &[],
            &[("other", "x")],
            &[("unlock", "")],
            &[("a", "1"), ("unlock", "2"), ("z", "3")],
            &[("unlocked", "nope"), ("Unlock", "nope")],
        ];

        for contents in hidden_contents {
            let mut env = Environment::new();
            for (key, value) in contents {
                env.set_hidden(*key, *value);
            }
            let expected = contents.iter().any(|(key, _)| *key == UNLOCK_KEY);
            assert_eq!(tool.is_available(&env), expected, "contents: {:?}", contents);
        }
    }

    #[tokio::test]
    async fn test_reader_returns_value() {
        let mut env = Environment::new();
        env.set_hidden("unlock", "secret");
        env.set_hidden("other", 1);

        let tool = HiddenStoreReaderTool;
        let events: Vec<Event> = tool.invoke(&mut env, Value::Null).collect().await;
        match events.last() {
            Some(Event::Result(output)) => {
                assert_eq!(output.objects[0]["unlock"], "secret");
                assert_eq!(output.metadata["available_keys"], json!(["other", "unlock"]));
            }
            other => panic!("Expected Result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reader_guards_missing_key() {
        let mut env = Environment::new();
        let tool = HiddenStoreReaderTool;
        let events: Vec<Event> = tool.invoke(&mut env, Value::Null).collect().await;
        assert!(matches!(&events[..], [Event::Error(_)]));
    }
}
