//! Prelude module for convenient imports.
//!
//! ```rust
//! use hybridkg_core::prelude::*;
//!
//! let working_set = WorkingSet::new();
//! assert!(working_set.is_empty());
//! ```

pub use crate::error::{HybridKgError, Result};

pub use crate::types::{
    Plan, QueryParams, Record, Step, VectorMatch, VectorSearch, WorkingSet, strip_internal_fields,
    value_text,
};

pub use crate::traits::{ChatModel, Embedder, GraphStore, QueryRunner, VectorStore};

pub use crate::config::{
    Backoff, EmbeddingModelConfig, EvaluationConfig, ExecutorConfig, HybridKgConfig, LlmConfig,
    RetryConfig, RewriterConfig,
};

pub use crate::resilience::{Resilient, retry_with_policy, with_timeout};

pub use async_trait::async_trait;
