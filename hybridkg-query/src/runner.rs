//! [`QueryRunner`] adapters used by batch evaluation.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use hybridkg_core::traits::{GraphStore, QueryRunner};
use hybridkg_core::{Record, Result, strip_internal_fields};

use crate::executor::PlanExecutor;
use crate::rewriter::QueryRewriter;

/// Runs a single extended query: rewrite, execute, strip internal fields.
///
/// Queries without extended predicates pass through unchanged, so the same
/// runner serves gold queries.
#[derive(Debug, Clone)]
pub struct ExtendedQueryRunner {
    graph_store: Arc<dyn GraphStore>,
    rewriter: Arc<dyn QueryRewriter>,
    internal_id_fields: Vec<String>,
}

impl ExtendedQueryRunner {
    /// Create a runner stripping the default internal fields.
    pub fn new(graph_store: Arc<dyn GraphStore>, rewriter: Arc<dyn QueryRewriter>) -> Self {
        Self {
            graph_store,
            rewriter,
            internal_id_fields: vec!["external_id".to_string(), "embedding".to_string()],
        }
    }

    /// Set the fields stripped from node maps.
    #[must_use]
    pub fn with_internal_id_fields(mut self, fields: Vec<String>) -> Self {
        self.internal_id_fields = fields;
        self
    }
}

#[async_trait]
impl QueryRunner for ExtendedQueryRunner {
    async fn run(&self, query: &str) -> Result<Vec<Record>> {
        let (text, params) = self.rewriter.rewrite(query).await?.into_parts();
        debug!("Running graph query:\n{}", text);
        let mut records = self.graph_store.query(&text, &params).await?;
        strip_internal_fields(&mut records, &self.internal_id_fields);
        Ok(records)
    }
}

/// Runs serialized plans through a [`PlanExecutor`].
#[derive(Debug, Clone)]
pub struct PlanRunner {
    executor: PlanExecutor,
}

impl PlanRunner {
    /// Create a runner.
    pub fn new(executor: PlanExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl QueryRunner for PlanRunner {
    async fn run(&self, plan_text: &str) -> Result<Vec<Record>> {
        self.executor.execute(plan_text).await.into_result()
    }
}
