//! Step-wise execution of hybrid retrieval plans.
//!
//! A plan interleaves structured graph queries and vector searches. Every
//! non-final step narrows a [`WorkingSet`] of node ids that the next step is
//! restricted to; the final step's records are the result.

use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use hybridkg_core::config::{ExecutorConfig, RewriterConfig};
use hybridkg_core::resilience::with_timeout;
use hybridkg_core::traits::{Embedder, GraphStore, VectorStore};
use hybridkg_core::{
    HybridKgError, Plan, Record, Result, Step, VectorMatch, VectorSearch, WorkingSet,
    strip_internal_fields,
};

use crate::rewriter::clauses::{apply_edits, union_branches};
use crate::rewriter::literals::mask_literals;
use crate::rewriter::{ExtendedQueryRewriter, QueryRewriter};

/// Parameter name the restriction preamble binds the working set to.
pub const WORKING_SET_PARAM: &str = "ids";

/// Prefix every top-level UNION branch of `query` with a preamble binding
/// the working set to `n`.
///
/// The working set arrives as the `$ids` parameter; each id is matched
/// against `n.<node_id_property>`. Variables do not cross UNION
/// boundaries, so each branch needs its own preamble.
pub fn restrict_to_working_set(query: &str, node_id_property: &str) -> String {
    let preamble = format!(
        "UNWIND ${WORKING_SET_PARAM} AS id\nMATCH (n) WHERE n.{node_id_property} = id\nWITH DISTINCT n\n"
    );
    let masked = mask_literals(query);
    let edits = union_branches(&masked)
        .into_iter()
        .map(|branch| {
            let offset = masked[branch.clone()]
                .find(|ch: char| !ch.is_whitespace())
                .map_or(branch.end, |skipped| branch.start + skipped);
            (offset..offset, preamble.clone())
        })
        .collect();
    apply_edits(query, edits)
}

/// The plan as far as it could be understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptedPlan {
    /// The plan parsed and was (at least partly) executed.
    Parsed(Plan),
    /// The plan text could not be parsed.
    Unparsed(String),
}

impl AttemptedPlan {
    /// The parsed plan, if any.
    pub fn as_plan(&self) -> Option<&Plan> {
        match self {
            Self::Parsed(plan) => Some(plan),
            Self::Unparsed(_) => None,
        }
    }

    /// Text suitable for showing the user what was attempted.
    pub fn display_text(&self) -> String {
        match self {
            Self::Parsed(plan) => {
                serde_json::to_string_pretty(plan).unwrap_or_else(|_| format!("{plan:?}"))
            }
            Self::Unparsed(raw) => raw.clone(),
        }
    }
}

/// Result of executing one plan.
///
/// Failures never escape as `Err`: the caller always gets the attempted
/// plan back so it can display what was tried. An empty `records` with no
/// `error` means the plan legitimately matched nothing.
#[derive(Debug)]
pub struct PlanOutcome {
    /// The plan that was attempted.
    pub plan: AttemptedPlan,
    /// Final records; empty on failure or when nothing matched.
    pub records: Vec<Record>,
    /// Parse or step failure.
    pub error: Option<HybridKgError>,
}

impl PlanOutcome {
    fn completed(plan: Plan, records: Vec<Record>) -> Self {
        Self {
            plan: AttemptedPlan::Parsed(plan),
            records,
            error: None,
        }
    }

    fn failed(plan: AttemptedPlan, error: HybridKgError) -> Self {
        Self {
            plan,
            records: Vec::new(),
            error: Some(error),
        }
    }

    /// Whether execution finished without error.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into the records, or the error if there was one.
    pub fn into_result(self) -> Result<Vec<Record>> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.records),
        }
    }
}

/// What one step produced.
enum StepResult {
    /// The working set for the next step.
    Narrowed(WorkingSet),
    /// Records of the final step.
    Final(Vec<Record>),
}

/// Executes plans against a graph store and a vector store.
///
/// The executor holds no per-plan state; every call to
/// [`execute`](Self::execute) owns its working set, so one executor can
/// serve concurrent questions.
///
/// # Examples
///
/// ```rust,no_run
/// use hybridkg_query::executor::PlanExecutor;
/// # use std::sync::Arc;
/// # use hybridkg_core::traits::{Embedder, GraphStore, VectorStore};
///
/// # async fn example(
/// #     graph: Arc<dyn GraphStore>,
/// #     vectors: Arc<dyn VectorStore>,
/// #     embedder: Arc<dyn Embedder>,
/// # ) -> hybridkg_core::Result<()> {
/// let executor = PlanExecutor::builder()
///     .graph_store(graph)
///     .vector_store(vectors)
///     .embedder(embedder)
///     .build()?;
///
/// let outcome = executor
///     .execute(r#"{"steps": [{"type": "vector", "search": "fluid leakage"}], "reasoning": ""}"#)
///     .await;
/// println!("{} records", outcome.records.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PlanExecutor {
    graph_store: Arc<dyn GraphStore>,
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    rewriter: Arc<dyn QueryRewriter>,
    config: ExecutorConfig,
}

impl PlanExecutor {
    /// Create a builder.
    pub fn builder() -> PlanExecutorBuilder {
        PlanExecutorBuilder::new()
    }

    /// Get the configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Parse and execute plan text.
    ///
    /// Malformed text yields an [`AttemptedPlan::Unparsed`] outcome carrying
    /// a [`HybridKgError::PlanParse`].
    #[instrument(skip(self, plan_text), fields(plan_len = plan_text.len()))]
    pub async fn execute(&self, plan_text: &str) -> PlanOutcome {
        match Plan::parse(plan_text) {
            Ok(plan) => self.execute_plan(plan).await,
            Err(e) => {
                error!("Error parsing plan: {}", e);
                PlanOutcome::failed(AttemptedPlan::Unparsed(plan_text.to_string()), e)
            }
        }
    }

    /// Execute an already parsed plan.
    pub async fn execute_plan(&self, plan: Plan) -> PlanOutcome {
        let mut working_set = WorkingSet::new();
        let last_index = plan.last_index();

        for index in 0..plan.steps.len() {
            let step = &plan.steps[index];
            let is_final = index == last_index;
            let restrict = index > 0;
            info!(
                "Running step {} of plan ({}). Final: {}, Restrict: {}.",
                index,
                step.kind(),
                is_final,
                restrict
            );

            let result = match step {
                Step::Structured { query } => {
                    self.structured_step(query, &working_set, restrict, is_final)
                        .await
                }
                Step::Semantic { search } => {
                    self.semantic_step(search, &working_set, restrict, is_final)
                        .await
                }
            };

            match result {
                Ok(StepResult::Final(records)) => {
                    info!("Plan finished with {} records", records.len());
                    return PlanOutcome::completed(plan, records);
                }
                Ok(StepResult::Narrowed(next)) => {
                    info!("Step {} finished - open pool of {} ids", index, next.len());
                    if next.is_empty() {
                        return PlanOutcome::completed(plan, Vec::new());
                    }
                    working_set = next;
                }
                Err(e) => {
                    error!("Error during retrieval at step {}: {}", index, e);
                    let error = HybridKgError::step_execution(index, e.to_string());
                    return PlanOutcome::failed(AttemptedPlan::Parsed(plan), error);
                }
            }
        }

        PlanOutcome::completed(plan, Vec::new())
    }

    async fn structured_step(
        &self,
        query: &str,
        working_set: &WorkingSet,
        restrict: bool,
        is_final: bool,
    ) -> Result<StepResult> {
        let timeout = self.config.call_timeout();
        let (mut text, mut params) =
            with_timeout(timeout, "query rewrite", self.rewriter.rewrite(query))
                .await?
                .into_parts();

        if restrict {
            text = restrict_to_working_set(&text, &self.config.node_id_property);
            params.insert(WORKING_SET_PARAM.to_string(), working_set.to_param());
        }

        debug!("Running graph query:\n{}", text);
        let mut records =
            with_timeout(timeout, "graph query", self.graph_store.query(&text, &params)).await?;
        info!("Graph query returned {} records", records.len());

        if is_final {
            strip_internal_fields(&mut records, &self.config.internal_id_fields);
            Ok(StepResult::Final(records))
        } else {
            Ok(StepResult::Narrowed(WorkingSet::from_records(
                &records,
                &self.config.id_field,
            )))
        }
    }

    async fn semantic_step(
        &self,
        search: &str,
        working_set: &WorkingSet,
        restrict: bool,
        is_final: bool,
    ) -> Result<StepResult> {
        let timeout = self.config.call_timeout();
        let embedding = with_timeout(timeout, "embed", self.embedder.embed(search)).await?;

        let mut request = VectorSearch::new(search, embedding)
            .with_top_k(self.config.vector_top_k)
            .with_threshold(self.config.vector_threshold);
        if restrict {
            request = request.restricted_to(working_set);
        }

        debug!(
            "Running vector search: {} (top-k: {:?}, threshold: {:?})",
            search, request.top_k, request.threshold
        );
        let matches =
            with_timeout(timeout, "vector search", self.vector_store.search(&request)).await?;
        info!("Vector search returned {} matches", matches.len());

        if is_final {
            Ok(StepResult::Final(
                matches.into_iter().map(VectorMatch::into_record).collect(),
            ))
        } else {
            Ok(StepResult::Narrowed(WorkingSet::from_matches(&matches)))
        }
    }
}

/// Builder for [`PlanExecutor`].
#[derive(Debug, Default)]
pub struct PlanExecutorBuilder {
    graph_store: Option<Arc<dyn GraphStore>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    embedder: Option<Arc<dyn Embedder>>,
    rewriter: Option<Arc<dyn QueryRewriter>>,
    rewriter_config: Option<RewriterConfig>,
    config: Option<ExecutorConfig>,
}

impl PlanExecutorBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the graph store.
    #[must_use]
    pub fn graph_store(mut self, graph_store: Arc<dyn GraphStore>) -> Self {
        self.graph_store = Some(graph_store);
        self
    }

    /// Set the vector store.
    #[must_use]
    pub fn vector_store(mut self, vector_store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(vector_store);
        self
    }

    /// Set the embedder used for vector steps and semantic matches.
    #[must_use]
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Use a custom rewriter instead of [`ExtendedQueryRewriter`].
    #[must_use]
    pub fn rewriter(mut self, rewriter: Arc<dyn QueryRewriter>) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    /// Configure the default rewriter.
    #[must_use]
    pub fn rewriter_config(mut self, config: RewriterConfig) -> Self {
        self.rewriter_config = Some(config);
        self
    }

    /// Set the executor configuration.
    #[must_use]
    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the executor.
    pub fn build(self) -> Result<PlanExecutor> {
        let graph_store = self
            .graph_store
            .ok_or_else(|| HybridKgError::configuration("Graph store is required"))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| HybridKgError::configuration("Vector store is required"))?;
        let embedder = self
            .embedder
            .ok_or_else(|| HybridKgError::configuration("Embedder is required"))?;

        let config = self.config.unwrap_or_default();
        config.validate()?;

        let rewriter = match self.rewriter {
            Some(rewriter) => rewriter,
            None => {
                let rewriter_config = self.rewriter_config.unwrap_or_default();
                rewriter_config.validate()?;
                Arc::new(ExtendedQueryRewriter::new(embedder.clone()).with_config(rewriter_config))
            }
        };

        Ok(PlanExecutor {
            graph_store,
            vector_store,
            embedder,
            rewriter,
            config,
        })
    }
}
