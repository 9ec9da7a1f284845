// ABOUTME: Environment module - the shared state store capabilities read and write.
// ABOUTME: Split into an append-only visible partition and a hidden key/value map.

mod store;

pub use store::*;
