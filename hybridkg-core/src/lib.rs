//! # hybridkg core
//!
//! Core traits, types, and configuration shared by the hybrid graph/vector
//! retrieval and evaluation crates:
//!
//! - **Data structures**: [`Plan`], [`Step`], [`WorkingSet`], [`Record`] and
//!   vector search types
//! - **Collaborator traits**: [`GraphStore`], [`VectorStore`], [`Embedder`],
//!   [`ChatModel`] and [`QueryRunner`]
//! - **Configuration**: serializable settings with validation
//! - **Resilience**: retry and timeout decorators for collaborators
//! - **Error handling**: one error enum for parsing, execution and evaluation
//!
//! ## Quick Start
//!
//! ```rust
//! use hybridkg_core::prelude::*;
//!
//! let plan = Plan::parse(r#"{"steps": [
//!     {"type": "kg", "query": "MATCH (n:FailureMode) RETURN n.external_id AS id"},
//!     {"type": "vector", "search": "bearing wear"}
//! ]}"#).unwrap();
//! assert_eq!(plan.len(), 2);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod prelude;

pub mod config;
pub mod error;
pub mod resilience;
pub mod traits;
pub mod types;

pub use error::{HybridKgError, Result};
pub use types::{
    Plan, QueryParams, Record, Step, VectorMatch, VectorSearch, WorkingSet, strip_internal_fields,
    value_text,
};

pub use traits::*;

/// Version information for the hybridkg core library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the hybridkg core library.
pub const NAME: &str = env!("CARGO_PKG_NAME");
