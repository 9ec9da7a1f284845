// ABOUTME: VectorSearchTool - searches a VectorStore collection with a query vector.
// ABOUTME: Store failures and malformed vectors are reported as Error events.

use std::sync::Arc;

use serde_json::Value;

use crate::environment::Environment;
use crate::search::VectorStore;
use crate::tool::{Event, EventStream, InputField, InputSchema, InputType, Tool, ToolOutput};

/// Tool that wraps a [`VectorStore`] search.
pub struct VectorSearchTool {
    store: Arc<dyn VectorStore>,
}

impl VectorSearchTool {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    /// Constructor suitable for [`ToolRegistry::register_factory`](crate::tool::ToolRegistry::register_factory).
    pub fn factory(store: Arc<dyn VectorStore>) -> impl Fn() -> Box<dyn Tool> + Send + Sync + 'static {
        move || Box::new(Self::new(store.clone())) as Box<dyn Tool>
    }
}

fn parse_vector(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

impl Tool for VectorSearchTool {
    fn name(&self) -> &str {
        "vector_search"
    }

    fn description(&self) -> &str {
        "Search a vector collection for the entries closest to a query vector."
    }

    fn inputs(&self) -> InputSchema {
        InputSchema::new()
            .field(
                "collection",
                InputField::new(InputType::String, "Collection to search").required(),
            )
            .field(
                "vector",
                InputField::new(InputType::List, "Query vector").required(),
            )
            .field(
                "limit",
                InputField::new(InputType::Integer, "Maximum number of hits").default_value(10),
            )
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
            let collection = inputs["collection"].as_str().unwrap_or_default().to_string();
            let limit = match inputs["limit"].as_u64() {
                Some(limit) => limit as usize,
                None => {
                    yield Event::error("Limit must be a non-negative integer.");
                    return;
                }
            };
            let vector = match parse_vector(&inputs["vector"]) {
                Some(vector) => vector,
                None => {
                    yield Event::error("Query vector must be a list of numbers.");
                    return;
                }
            };

            yield Event::status(format!("Searching '{}'.", collection));
            match self.store.search(&collection, &vector, limit).await {
                Ok(hits) => {
                    let objects = hits
                        .iter()
                        .filter_map(|hit| serde_json::to_value(hit).ok())
                        .collect();
                    let output = ToolOutput::new("search_results", objects)
                        .with_metadata("collection", &collection)
                        .with_metadata("count", hits.len())
                        .with_message("Found {count} matches in {collection}.");
                    yield Event::Result(output);
                }
                Err(e) => {
                    yield Event::error(format!("Search failed: {}", e));
                }
            }
        })
    }
}
