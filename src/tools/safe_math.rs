// ABOUTME: SafeMathTool - aggregates a list of numbers (sum, product, min, max, mean).
// ABOUTME: Accepts a JSON list or a comma/space separated string; bad input yields Error.

use serde_json::{Value, json};

use crate::environment::Environment;
use crate::tool::{Event, EventStream, InputField, InputSchema, InputType, Tool, ToolOutput};

/// Tool for aggregating numbers.
#[derive(Default)]
pub struct SafeMathTool;

fn parse_numbers(raw: &Value) -> Result<Vec<f64>, String> {
    match raw {
        Value::String(text) => {
            let parts: Vec<&str> = if text.contains(',') {
                text.split(',').flat_map(str::split_whitespace).collect()
            } else {
                text.split_whitespace().collect()
            };
            parts
                .into_iter()
                .map(|p| p.parse::<f64>())
                .collect::<Result<_, _>>()
                .map_err(|_| "One or more provided numbers are invalid.".to_string())
        }
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .collect::<Option<_>>()
            .ok_or_else(|| "List contains non-numeric values.".to_string()),
        _ => Err("Unsupported numbers input format.".to_string()),
    }
}

fn aggregate(operation: &str, numbers: &[f64]) -> Option<f64> {
    let value = match operation {
        "sum" => numbers.iter().sum(),
        "product" => numbers.iter().product(),
        "min" => numbers.iter().copied().fold(f64::INFINITY, f64::min),
        "max" => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        "mean" => numbers.iter().sum::<f64>() / numbers.len() as f64,
        _ => return None,
    };
    Some(value)
}

impl Tool for SafeMathTool {
    fn name(&self) -> &str {
        "safe_math"
    }

    fn description(&self) -> &str {
        "Safely perform a mathematical operation over a list of numbers. \
         Supported operations: sum, product, min, max, mean. Input numbers can be a list \
         or a comma/space separated string."
    }

    fn inputs(&self) -> InputSchema {
        InputSchema::new()
            .field(
                "operation",
                InputField::new(
                    InputType::String,
                    "The aggregation to perform: sum | product | min | max | mean",
                )
                .required(),
            )
            .field(
                "numbers",
                InputField::new(
                    InputType::Any,
                    "Numbers as list OR comma / space separated string",
                )
                .required(),
            )
    }

    fn ends_run(&self) -> bool {
        true
    }

    fn invoke<'a>(&'a self, _env: &'a mut Environment, inputs: Value) -> EventStream<'a> {
        Box::pin(async_stream::stream! {
            let inputs = match self.inputs().resolve(&inputs) {
                Ok(inputs) => inputs,
                Err(e) => {
                    yield Event::error(e.to_string());
                    return;
                }
            };

            let numbers = match parse_numbers(&inputs["numbers"]) {
                Ok(numbers) => numbers,
                Err(msg) => {
                    yield Event::error(msg);
                    return;
                }
            };
            if numbers.is_empty() {
                yield Event::error("No numbers provided.");
                return;
            }

            let operation = inputs["operation"].as_str().unwrap_or_default().trim().to_lowercase();
            let value = match aggregate(&operation, &numbers) {
                Some(value) => value,
                None => {
                    yield Event::error(format!(
                        "Unsupported operation '{}'. Use one of: sum, product, min, max, mean.",
                        operation
                    ));
                    return;
                }
            };

            yield Event::status(format!(
                "Computed {} over {} numbers successfully.",
                operation,
                numbers.len()
            ));
            let output = ToolOutput::new(
                "math_result",
                vec![json!({"operation": operation, "value": value, "count": numbers.len()})],
            )
            .with_metadata("numbers", &numbers)
            .with_message("Performed {operation} over {count} numbers. Result value: {value}.");
            yield Event::Result(output);
        })
    }
}
