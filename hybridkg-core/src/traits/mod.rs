//! Core traits for the hybridkg workspace.
//!
//! Every external collaborator (graph store, vector store, embedding model,
//! chat model) is reached through one of these traits, so retrieval and
//! evaluation logic can be exercised against in-memory doubles.

pub mod chat;
pub mod embedder;
pub mod graph_store;
pub mod runner;
pub mod storage;

// Re-export all traits for convenience
pub use chat::*;
pub use embedder::*;
pub use graph_store::*;
pub use runner::*;
pub use storage::*;
