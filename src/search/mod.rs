// ABOUTME: Vector search module - the store contract capabilities search against.
// ABOUTME: Ships an in-memory cosine-similarity store for tests and small setups.

mod memory;
mod store;

pub use memory::MemoryVectorStore;
pub use store::{SearchHit, VectorStore};
