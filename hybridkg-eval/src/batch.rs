//! Batch generation and evaluation of a retrieval strategy.
//!
//! `generate` turns every gold question into a generated query; `evaluate`
//! runs gold and generated queries through the same [`QueryRunner`] and
//! scores the results.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use hybridkg_core::config::EvaluationConfig;
use hybridkg_core::traits::{ChatModel, QueryRunner};
use hybridkg_core::{HybridKgError, Record, Result};
use hybridkg_query::planner::PlanGenerator;

use crate::alias::{AliasMapper, apply_alias_mapping, needs_alias_mapping};
use crate::dataset::{GeneratedQuery, GoldQuery, load_json, save_json};
use crate::metrics::{Metrics, calc_col_metrics, calc_row_metrics, query_length_ratio};
use crate::report::write_metrics_csv;

/// Label of the summary row.
pub const AVERAGE_ROW_ID: &str = "avg";

/// Produces query (or plan) text for a question.
#[async_trait]
pub trait QueryGenerator: Send + Sync + std::fmt::Debug {
    /// Generate query text for `question`.
    async fn generate(&self, question: &str) -> Result<String>;
}

#[async_trait]
impl QueryGenerator for PlanGenerator {
    async fn generate(&self, question: &str) -> Result<String> {
        self.generate_plan(question).await
    }
}

/// Outcome of one evaluation batch.
#[derive(Debug, Default)]
pub struct EvaluationReport {
    /// Scored questions, in gold order.
    pub rows: Vec<Metrics>,

    /// Mean of `rows`, when any question was scored.
    pub average: Option<Metrics>,

    /// Questions skipped because their columns could not be mapped.
    pub skipped: Vec<HybridKgError>,

    /// The execution failure that stopped the batch early.
    pub aborted: Option<HybridKgError>,
}

impl EvaluationReport {
    /// Scored rows followed by the summary row.
    pub fn csv_rows(&self) -> Vec<Metrics> {
        self.rows.iter().chain(self.average.as_ref()).cloned().collect()
    }

    /// Whether every gold question was processed.
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }
}

/// Scores a strategy's generated queries against gold queries.
#[derive(Debug, Clone)]
pub struct PlanOutputEvaluator {
    mapper: AliasMapper,
    config: EvaluationConfig,
}

impl PlanOutputEvaluator {
    /// Create an evaluator mapping aliases with `mapper_chat`.
    pub fn new(mapper_chat: Arc<dyn ChatModel>) -> Self {
        Self::with_mapper(AliasMapper::new(mapper_chat))
    }

    /// Create an evaluator with a configured alias mapper.
    pub fn with_mapper(mapper: AliasMapper) -> Self {
        Self {
            mapper,
            config: EvaluationConfig::default(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: EvaluationConfig) -> Self {
        self.config = config;
        self
    }

    /// Generate a query for every gold question.
    pub async fn generate(
        &self,
        generator: &dyn QueryGenerator,
        gold: &[GoldQuery],
    ) -> Result<Vec<GeneratedQuery>> {
        let mut generated = Vec::with_capacity(gold.len());
        for entry in gold {
            info!("Generating query for question {}", entry.id);
            let query = generator.generate(&entry.question).await?;
            generated.push(GeneratedQuery::new(entry.id.clone(), query));
        }
        Ok(generated)
    }

    /// Generate queries for a gold store file and write the generated store.
    pub async fn generate_files<P, Q>(
        &self,
        generator: &dyn QueryGenerator,
        gold_path: P,
        generated_path: Q,
    ) -> Result<Vec<GeneratedQuery>>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let gold: Vec<GoldQuery> = load_json(gold_path).await?;
        let generated = self.generate(generator, &gold).await?;
        save_json(generated_path, &generated).await?;
        Ok(generated)
    }

    /// Score generated queries against gold queries.
    ///
    /// Entries are paired by id; gold entries without a generated entry are
    /// skipped. A query that fails to run stops the batch, and rows scored
    /// so far are kept. A question whose columns cannot be mapped is skipped.
    #[instrument(skip_all, fields(questions = gold.len()))]
    pub async fn evaluate(
        &self,
        runner: &dyn QueryRunner,
        gold: &[GoldQuery],
        generated: &[GeneratedQuery],
    ) -> EvaluationReport {
        let generated_by_id: HashMap<&str, &GeneratedQuery> = generated
            .iter()
            .map(|entry| (entry.id.as_str(), entry))
            .collect();

        let mut report = EvaluationReport::default();
        for gold_query in gold {
            let Some(generated_query) = generated_by_id.get(gold_query.id.as_str()) else {
                warn!("No generated query for question {}", gold_query.id);
                continue;
            };

            match self.evaluate_one(runner, gold_query, generated_query).await {
                Ok(metrics) => report.rows.push(metrics),
                Err(e) if e.aborts_batch() => {
                    error!("Error during query/plan execution on ID {}: {}", gold_query.id, e);
                    report.aborted = Some(e);
                    break;
                }
                Err(e) => {
                    warn!("Skipping question {}: {}", gold_query.id, e);
                    report.skipped.push(e);
                }
            }
        }

        report.average = Metrics::average(AVERAGE_ROW_ID, &report.rows)
            .map(|average| average.map_values(|v| self.config.round(v)));
        info!(
            "Evaluated {} questions, skipped {}, aborted: {}",
            report.rows.len(),
            report.skipped.len(),
            report.aborted.is_some()
        );
        report
    }

    /// Load both stores, evaluate, and write the metrics CSV.
    ///
    /// The CSV is written even when the batch stopped early.
    pub async fn evaluate_files<G, Q, M>(
        &self,
        runner: &dyn QueryRunner,
        gold_path: G,
        generated_path: Q,
        metrics_path: M,
    ) -> Result<EvaluationReport>
    where
        G: AsRef<Path>,
        Q: AsRef<Path>,
        M: AsRef<Path>,
    {
        let gold: Vec<GoldQuery> = load_json(gold_path).await?;
        let generated: Vec<GeneratedQuery> = load_json(generated_path).await?;
        let report = self.evaluate(runner, &gold, &generated).await;
        write_metrics_csv(metrics_path, &report.csv_rows()).await?;
        Ok(report)
    }

    async fn evaluate_one(
        &self,
        runner: &dyn QueryRunner,
        gold: &GoldQuery,
        generated: &GeneratedQuery,
    ) -> Result<Metrics> {
        let gold_output = run(runner, &gold.id, &gold.query).await?;
        let mut generated_output = run(runner, &gold.id, &generated.generated_query).await?;

        let gold_fields = field_names(&gold_output);
        let generated_fields = field_names(&generated_output);
        if !gold_fields.is_empty()
            && !generated_fields.is_empty()
            && needs_alias_mapping(&gold_fields, &generated_fields)
        {
            let mapping = self
                .mapper
                .predict(&gold.id, &gold_fields, &generated_fields)
                .await?;
            info!("Mapping for question {}: {:?}", gold.id, mapping);
            generated_output = apply_alias_mapping(generated_output, &mapping);
        }

        let optional = &gold.eval_config.optional_columns;
        let rows = calc_row_metrics(&gold_output, &generated_output, &gold.eval_config);
        let cols = calc_col_metrics(&gold_fields, field_names(&generated_output), optional);
        let length = query_length_ratio(&gold.query, &generated.generated_query);

        Ok(Metrics::new(gold.id.clone(), rows, cols, length).map_values(|v| self.config.round(v)))
    }
}

async fn run(runner: &dyn QueryRunner, question_id: &str, query: &str) -> Result<Vec<Record>> {
    runner
        .run(query)
        .await
        .map_err(|e| HybridKgError::execution(question_id, e.to_string()))
}

fn field_names(records: &[Record]) -> Vec<String> {
    records
        .first()
        .map(|record| record.keys().cloned().collect())
        .unwrap_or_default()
}
