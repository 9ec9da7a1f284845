// ABOUTME: Built-in example tools exercising the capability contract.
// ABOUTME: Includes math aggregation, environment inspection, hidden state, and search.

mod environment_summary;
mod hidden_store;
mod safe_math;
mod tell_a_joke;
mod vector_search;

pub use environment_summary::EnvironmentSummaryTool;
pub use hidden_store::{HiddenStoreReaderTool, HiddenStoreWriterTool, UNLOCK_KEY};
pub use safe_math::SafeMathTool;
pub use tell_a_joke::TellAJokeTool;
pub use vector_search::VectorSearchTool;

use crate::tool::ToolRegistry;

/// Register every built-in tool that needs no external collaborator.
pub async fn register_builtin(registry: &ToolRegistry) {
    registry.register::<SafeMathTool>().await;
    registry.register::<EnvironmentSummaryTool>().await;
    registry.register::<HiddenStoreWriterTool>().await;
    registry.register::<HiddenStoreReaderTool>().await;
    registry.register::<TellAJokeTool>().await;
}
