//! Retriever backends.

mod memory;
mod qdrant;

pub use memory::{MemoryIndex, MemoryPoint};
pub use qdrant::QdrantRetriever;
