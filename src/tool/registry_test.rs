// ABOUTME: Tests for ToolRegistry - registration, lookup, fresh instances.
// ABOUTME: Uses a counting echo tool for testing.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::StreamExt;

use super::*;
use crate::environment::Environment;
use crate::error::ToolError;

/// A simple test tool.
#[derive(Default)]
struct EchoTool;

impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes input back"
    }

    fn inputs(&self) -> InputSchema {
        InputSchema::new().field(
            "message",
            InputField::new(InputType::String, "Text to echo").required(),
        )
    }

    fn ends_run(&self) -> bool {
        true
    }

    fn invoke<'a>(&'a self, _env: &'a mut Environment, inputs: serde_json::Value) -> EventStream<'a> {
        Box::pin(async_stream::stream! {
            let message = inputs["message"].as_str().unwrap_or("").to_string();
            yield Event::Result(ToolOutput::new("echo", vec![serde_json::json!(message)]));
        })
    }
}

#[tokio::test]
async fn test_register_and_create() {
    let registry = ToolRegistry::new();
    let name = registry.register::<EchoTool>().await;
    assert_eq!(name, "echo");

    let tool = registry.create("echo").await.unwrap();
    assert_eq!(tool.name(), "echo");
}

#[tokio::test]
async fn test_create_nonexistent() {
    let registry = ToolRegistry::new();
    assert!(registry.get("nonexistent").await.is_none());

    match registry.create("nonexistent").await {
        Err(ToolError::NotFound(name)) => assert_eq!(name, "nonexistent"),
        Err(other) => panic!("Expected NotFound, got {:?}", other),
        Ok(_) => panic!("Expected NotFound, got a tool"),
    }
}

#[tokio::test]
async fn test_factory_builds_fresh_instances() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();

    let registry = ToolRegistry::new();
    registry
        .register_factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::new(EchoTool) as Box<dyn Tool>
        })
        .await;
    // One instance is built to read the name.
    assert_eq!(built.load(Ordering::SeqCst), 1);

    registry.create("echo").await.unwrap();
    registry.create("echo").await.unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_invoke_created_tool() {
    let registry = ToolRegistry::new();
    registry.register::<EchoTool>().await;

    let tool = registry.create("echo").await.unwrap();
    let mut env = Environment::new();
    let events: Vec<Event> = tool
        .invoke(&mut env, serde_json::json!({"message": "hi"}))
        .collect()
        .await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::Result(output) => assert_eq!(output.objects[0], "hi"),
        other => panic!("Expected Result, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unregister() {
    let registry = ToolRegistry::new();
    registry.register::<EchoTool>().await;
    assert_eq!(registry.count().await, 1);

    registry.unregister("echo").await;
    assert_eq!(registry.count().await, 0);
    assert!(registry.get("echo").await.is_none());
}

#[tokio::test]
async fn test_descriptors() {
    let registry = ToolRegistry::new();
    registry.register::<EchoTool>().await;

    let descriptors = registry.descriptors().await;
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].name, "echo");
    assert_eq!(descriptors[0].description, "Echoes input back");
    assert!(descriptors[0].ends_run);
    assert!(descriptors[0].inputs.get("message").unwrap().required);
}

#[tokio::test]
async fn test_builtin_tools() {
    let registry = ToolRegistry::with_builtin_tools().await;
    let names = registry.list().await;
    for expected in [
        "environment_summary",
        "hidden_store_reader",
        "hidden_store_writer",
        "safe_math",
        "tell_a_joke",
    ] {
        assert!(names.contains(&expected.to_string()), "missing {}", expected);
    }
}

#[tokio::test]
async fn test_clone_shares_state() {
    let registry = ToolRegistry::new();
    let clone = registry.clone();

    registry.register::<EchoTool>().await;
    assert_eq!(clone.count().await, 1);
}
