// ABOUTME: EnvironmentSummaryTool - reports what the environment currently holds.
// ABOUTME: One object per result group; the reserved SelfInfo group is never listed.

use serde_json::{Value, json};

use crate::environment::Environment;
use crate::tool::{Event, EventStream, Tool, ToolOutput};

/// Tool that summarizes the visible environment.
#[derive(Default)]
pub struct EnvironmentSummaryTool;

impl Tool for EnvironmentSummaryTool {
    fn name(&self) -> &str {
        "environment_summary"
    }

    fn description(&self) -> &str {
        "Review and summarise what data is currently stored in the environment."
    }

    fn invoke<'a>(&'a self, env: &'a mut Environment, _inputs: Value) -> EventStream<'a> {
        Box::pin(async_stream::stream! {
            let summary = env.summary();
            let total = summary.len();

            let objects = if summary.is_empty() {
                vec![json!({"message": "Environment empty"})]
            } else {
                summary
                    .iter()
                    .filter_map(|entry| serde_json::to_value(entry).ok())
                    .collect()
            };

            yield Event::status("Calculated environment summary.");
            let output = ToolOutput::new("environment_summary", objects)
                .with_metadata("total_entries", total)
                .with_message("Environment contains {total_entries} result group(s).");
            yield Event::Result(output);
        })
    }
}
