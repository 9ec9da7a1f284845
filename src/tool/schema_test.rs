// ABOUTME: Tests for InputSchema - defaults, required fields, type checks.
// ABOUTME: Also checks the serialized field shape.

use serde_json::json;

use super::*;
use crate::error::ToolError;

fn schema() -> InputSchema {
    InputSchema::new()
        .field(
            "operation",
            InputField::new(InputType::String, "The aggregation").required(),
        )
        .field(
            "precision",
            InputField::new(InputType::Integer, "Digits").default_value(2),
        )
        .field("note", InputField::new(InputType::String, "Optional note"))
}

#[test]
fn test_resolve_fills_defaults() {
    let resolved = schema().resolve(&json!({"operation": "sum"})).unwrap();
    assert_eq!(resolved["operation"], "sum");
    assert_eq!(resolved["precision"], 2);
    assert!(!resolved.contains_key("note"));
}

#[test]
fn test_resolve_missing_required() {
    let err = schema().resolve(&json!({})).unwrap_err();
    match err {
        ToolError::InvalidInput(msg) => assert!(msg.contains("operation")),
        other => panic!("Expected InvalidInput, got {:?}", other),
    }
}

#[test]
fn test_resolve_null_counts_as_absent() {
    let err = schema().resolve(&json!({"operation": null})).unwrap_err();
    assert!(matches!(err, ToolError::InvalidInput(_)));

    let resolved = schema()
        .resolve(&json!({"operation": "sum", "precision": null}))
        .unwrap();
    assert_eq!(resolved["precision"], 2);
}

#[test]
fn test_resolve_wrong_type() {
    let err = schema().resolve(&json!({"operation": 5})).unwrap_err();
    match err {
        ToolError::InvalidInput(msg) => assert!(msg.contains("string")),
        other => panic!("Expected InvalidInput, got {:?}", other),
    }
}

#[test]
fn test_resolve_passes_unknown_keys() {
    let resolved = schema()
        .resolve(&json!({"operation": "sum", "extra": [1, 2]}))
        .unwrap();
    assert_eq!(resolved["extra"], json!([1, 2]));
}

#[test]
fn test_resolve_rejects_non_object() {
    assert!(schema().resolve(&json!("sum")).is_err());
    assert!(InputSchema::new().resolve(&serde_json::Value::Null).unwrap().is_empty());
}

#[test]
fn test_type_matching() {
    assert!(InputType::Number.matches(&json!(1)));
    assert!(InputType::Number.matches(&json!(1.5)));
    assert!(!InputType::Integer.matches(&json!(1.5)));
    assert!(InputType::List.matches(&json!([])));
    assert!(InputType::Any.matches(&json!(null)));
}

#[test]
fn test_serialized_shape() {
    let value = serde_json::to_value(schema()).unwrap();
    assert_eq!(value["operation"]["type"], "string");
    assert_eq!(value["operation"]["required"], true);
    assert_eq!(value["precision"]["default"], 2);
    assert!(value["note"].get("default").is_none());
}
