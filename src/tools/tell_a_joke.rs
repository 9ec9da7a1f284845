// ABOUTME: TellAJokeTool - returns the joke it was given as a terminal result.
// ABOUTME: Smallest possible tool; useful for wiring tests.

use serde_json::{Value, json};

use crate::environment::Environment;
use crate::tool::{Event, EventStream, InputField, InputSchema, InputType, Tool, ToolOutput};

/// Tool that displays a joke to the user.
#[derive(Default)]
pub struct TellAJokeTool;

impl Tool for TellAJokeTool {
    fn name(&self) -> &str {
        "tell_a_joke"
    }

    fn description(&self) -> &str {
        "Displays a joke to the user."
    }

    fn inputs(&self) -> InputSchema {
        InputSchema::new().field(
            "joke",
            InputField::new(InputType::String, "A joke to tell.").required(),
        )
    }

    fn ends_run(&self) -> bool {
        true
    }

    fn invoke<'a>(&'a self, _env: &'a mut Environment, inputs: Value) -> EventStream<'a> {
        Box::pin(async_stream::stream! {
            match self.inputs().resolve(&inputs) {
                Ok(inputs) => {
                    let joke = inputs["joke"].clone();
                    yield Event::Result(ToolOutput::new("response", vec![json!({"text": joke})]));
                }
                Err(e) => {
                    yield Event::error(e.to_string());
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_echoes_joke() {
        let mut env = Environment::new();
        let events: Vec<Event> = TellAJokeTool
            .invoke(&mut env, json!({"joke": "knock knock"}))
            .collect()
            .await;

        match &events[..] {
            [Event::Result(output)] => assert_eq!(output.objects[0]["text"], "knock knock"),
            other => panic!("Expected one Result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_joke() {
        let mut env = Environment::new();
        let events: Vec<Event> = TellAJokeTool.invoke(&mut env, json!({})).collect().await;
        assert!(matches!(&events[..], [Event::Error(_)]));
    }
}
