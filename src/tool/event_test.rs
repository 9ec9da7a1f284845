// ABOUTME: Tests for Event and ToolOutput - constructors, metadata, templates.
// ABOUTME: Verifies message rendering and conversion into environment batches.

use serde_json::json;

use super::*;

#[test]
fn test_event_constructors() {
    assert_eq!(Event::status("working"), Event::Status("working".into()));
    assert_eq!(Event::error("bad"), Event::Error("bad".into()));
    assert_eq!(Event::status("x").kind(), "status");
    assert_eq!(Event::error("x").kind(), "error");
    assert_eq!(Event::from(ToolOutput::default()).kind(), "result");
}

#[test]
fn test_with_metadata() {
    let output = ToolOutput::new("math_result", vec![json!({"value": 6})])
        .with_metadata("count", 3)
        .with_metadata("cached", true);

    assert_eq!(output.metadata["count"], 3);
    assert_eq!(output.metadata["cached"], true);
    assert_eq!(output.first_object(), Some(&json!({"value": 6})));
}

#[test]
fn test_render_message_from_metadata_and_first_object() {
    let output = ToolOutput::new(
        "math_result",
        vec![json!({"operation": "sum", "value": 6.0, "count": 3})],
    )
    .with_metadata("count", 99)
    .with_message("Performed {operation} over {count} numbers. Result value: {value}.");

    // Metadata wins over object fields with the same key.
    assert_eq!(
        output.render_message(),
        "Performed sum over 99 numbers. Result value: 6.0."
    );
}

#[test]
fn test_render_message_keeps_unknown_placeholders() {
    let output = ToolOutput::new("r", vec![]).with_message("Missing {nothing} here");
    assert_eq!(output.render_message(), "Missing {nothing} here");
}

#[test]
fn test_render_message_without_placeholders() {
    let output = ToolOutput::new("r", vec![json!(1)]).with_message("plain");
    assert_eq!(output.render_message(), "plain");
}

#[test]
fn test_to_batch() {
    let output = ToolOutput::new("r", vec![json!(1), json!(2)]).with_metadata("k", "v");
    let batch = output.to_batch();
    assert_eq!(batch.objects.len(), 2);
    assert_eq!(batch.metadata["k"], "v");
}
