//! Collaborator implementations for hybridkg.
//!
//! This crate provides an in-memory vector store and, behind the `api`
//! feature, chat and embedding models reached through siumai.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod llm;
pub mod vector_stores;

// Re-export commonly used types
pub use vector_stores::InMemoryVectorStore;

#[cfg(feature = "api")]
pub use llm::{SiumaiChatModel, SiumaiEmbedder};
