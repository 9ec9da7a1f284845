// ABOUTME: MemoryVectorStore - in-memory VectorStore ranking points by cosine
// ABOUTME: similarity. Not persisted; intended for tests and small workloads.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{SearchHit, VectorStore};
use crate::error::ToolError;

struct Point {
    id: String,
    vector: Vec<f32>,
    payload: serde_json::Value,
}

struct Collection {
    vector_size: usize,
    points: Vec<Point>,
}

/// In-memory vector store.
#[derive(Default)]
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn check_size(expected: usize, vector: &[f32]) -> Result<(), ToolError> {
    if vector.len() != expected {
        return Err(ToolError::InvalidInput(format!(
            "vector has {} dimensions, collection expects {}",
            vector.len(),
            expected
        )));
    }
    Ok(())
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn create_collection(&self, name: &str, vector_size: usize) -> Result<(), ToolError> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_insert_with(|| Collection {
            vector_size,
            points: Vec::new(),
        });
        Ok(())
    }

    async fn insert(
        &self,
        collection: &str,
        vectors: Vec<Vec<f32>>,
        payloads: Vec<serde_json::Value>,
    ) -> Result<Vec<String>, ToolError> {
        if vectors.len() != payloads.len() {
            return Err(ToolError::InvalidInput(format!(
                "{} vectors but {} payloads",
                vectors.len(),
                payloads.len()
            )));
        }

        let mut collections = self.collections.write().await;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| ToolError::NotFound(format!("collection '{}'", collection)))?;

        for vector in &vectors {
            check_size(target.vector_size, vector)?;
        }

        let mut ids = Vec::with_capacity(vectors.len());
        for (vector, payload) in vectors.into_iter().zip(payloads) {
            let id = Uuid::new_v4().to_string();
            ids.push(id.clone());
            target.points.push(Point {
                id,
                vector,
                payload,
            });
        }
        Ok(ids)
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, ToolError> {
        let collections = self.collections.read().await;
        let target = collections
            .get(collection)
            .ok_or_else(|| ToolError::NotFound(format!("collection '{}'", collection)))?;
        check_size(target.vector_size, vector)?;

        let mut hits: Vec<SearchHit> = target
            .points
            .iter()
            .map(|point| SearchHit {
                id: point.id.clone(),
                score: cosine(vector, &point.vector),
                payload: point.payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }
}
