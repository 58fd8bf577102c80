//! Query execution as seen by the evaluator.

use async_trait::async_trait;

use crate::{Record, Result};

/// Turns a query (or serialized plan) into result records.
///
/// Batch evaluation is handed one of these to execute both the gold and the
/// generated query of every benchmark question.
#[async_trait]
pub trait QueryRunner: Send + Sync + std::fmt::Debug {
    /// Execute the query and return its records.
    async fn run(&self, query: &str) -> Result<Vec<Record>>;
}
