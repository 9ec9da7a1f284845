// ABOUTME: Defines the VectorStore trait - collection management, inserts, and
// ABOUTME: nearest-neighbour search returning scored payloads.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// One search match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub payload: serde_json::Value,
}

/// A vector database that tools can search.
///
/// Implement this trait to back [`VectorSearchTool`](crate::tools::VectorSearchTool)
/// with a real service; connection handling belongs to the implementation.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a collection if it does not already exist.
    async fn create_collection(&self, name: &str, vector_size: usize) -> Result<(), ToolError>;

    /// Insert vectors with their payloads, returning the new point ids.
    async fn insert(
        &self,
        collection: &str,
        vectors: Vec<Vec<f32>>,
        payloads: Vec<serde_json::Value>,
    ) -> Result<Vec<String>, ToolError>;

    /// Return up to `limit` hits, best first.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, ToolError>;
}
