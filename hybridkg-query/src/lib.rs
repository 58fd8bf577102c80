//! Query processing for hybrid graph/vector retrieval.
//!
//! This crate turns questions into records:
//!
//! - **Rewriter**: expands `FUZZY_MATCH` and `SEMANTIC_MATCH` into native
//!   graph query constructs with bound parameters
//! - **Executor**: runs multi-step plans, narrowing a working set of node ids
//!   between steps
//! - **Planner**: asks a chat model for a plan
//! - **Generator**: writes the final answer from retrieved records
//! - **Runners**: [`QueryRunner`](hybridkg_core::traits::QueryRunner)
//!   adapters for batch evaluation
//!
//! # Architecture
//!
//! ```text
//! Question → PlanGenerator → plan text
//!   ↓
//! PlanExecutor ─┬─ kg step → QueryRewriter → GraphStore
//!               └─ vector step → Embedder → VectorStore
//!   ↓
//! FinalGenerator → answer
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod executor;
pub mod generator;
pub mod planner;
pub mod rewriter;
pub mod runner;

/// Re-export commonly used types and traits.
pub mod prelude {
    pub use crate::executor::{AttemptedPlan, PlanExecutor, PlanExecutorBuilder, PlanOutcome};
    pub use crate::generator::FinalGenerator;
    pub use crate::planner::{PlanGenerator, PlannerRetriever};
    pub use crate::rewriter::{
        ExtendedQueryRewriter, QueryRewriter, RewrittenQuery, expand_extended_predicates,
    };
    pub use crate::runner::{ExtendedQueryRunner, PlanRunner};

    pub use hybridkg_core::prelude::*;
}
