//! Claim-level scoring of free-text answers.
//!
//! A reference answer is split into atomic claims (nuggets) tagged
//! `ESSENTIAL` or `OPTIONAL`. A second model call judges each nugget against
//! a candidate answer as `MATCHED`, `MISSING` or `INCORRECT` and lists the
//! candidate's extra claims.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use hybridkg_core::config::EvaluationConfig;
use hybridkg_core::traits::ChatModel;
use hybridkg_core::{HybridKgError, Result};
use hybridkg_query::planner::strip_code_fences;

use crate::dataset::QaEntry;
use crate::run::RunEntry;

/// Extraction prompt; `{question}` and `{model_answer}` are substituted.
pub const DEFAULT_EXTRACTION_PROMPT: &str = r#"Break the reference answer to the question below into atomic factual claims ("nuggets").
Tag a nugget ESSENTIAL when a correct answer must contain it and OPTIONAL when it only adds useful detail.

Question:
{question}

Reference answer:
{model_answer}

Answer with JSON: {"nuggets": [{"nugget": "<claim>", "status": "ESSENTIAL" | "OPTIONAL"}]}"#;

/// Matching prompt; `{question}`, `{model_nuggets}` and `{generated_answer}`
/// are substituted.
pub const DEFAULT_MATCHING_PROMPT: &str = r#"Judge a generated answer against reference nuggets.
For every nugget decide whether the generated answer states it (MATCHED), does not mention it (MISSING) or contradicts it (INCORRECT).
Also list the factual claims of the generated answer that match no nugget.

Question:
{question}

Reference nuggets:
{model_nuggets}

Generated answer:
{generated_answer}

Answer with JSON: {"nugget_results": [{"nugget": "<claim>", "status": "ESSENTIAL" | "OPTIONAL", "match": "MATCHED" | "MISSING" | "INCORRECT"}], "extra_claims": ["<claim>"]}"#;

/// How much a nugget matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NuggetStatus {
    /// Required in a correct answer.
    Essential,
    /// Nice to have.
    Optional,
}

/// How a candidate answer treats a nugget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchStatus {
    /// The answer states the claim.
    Matched,
    /// The answer does not mention the claim.
    Missing,
    /// The answer contradicts the claim.
    Incorrect,
}

/// An atomic claim of a reference answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nugget {
    /// The claim.
    #[serde(rename = "nugget")]
    pub text: String,
    /// Its importance.
    pub status: NuggetStatus,
}

impl Nugget {
    /// Create a nugget.
    pub fn new<S: Into<String>>(text: S, status: NuggetStatus) -> Self {
        Self {
            text: text.into(),
            status,
        }
    }
}

/// A nugget judged against a candidate answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NuggetMatch {
    /// The claim.
    #[serde(rename = "nugget")]
    pub text: String,
    /// Its importance.
    pub status: NuggetStatus,
    /// The judgement.
    #[serde(rename = "match")]
    pub outcome: MatchStatus,
}

impl NuggetMatch {
    /// Create a judged nugget.
    pub fn new<S: Into<String>>(text: S, status: NuggetStatus, outcome: MatchStatus) -> Self {
        Self {
            text: text.into(),
            status,
            outcome,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExtractionResponse {
    nuggets: Vec<Nugget>,
}

/// The matcher's verdict on one candidate answer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NuggetJudgement {
    /// One entry per reference nugget.
    pub nugget_results: Vec<NuggetMatch>,
    /// Candidate claims matching no nugget.
    #[serde(default)]
    pub extra_claims: Vec<String>,
}

/// Nugget precision and recall.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NuggetMetrics {
    /// Weighted share of the candidate's claims that are supported.
    pub precision: f64,
    /// Share of essential nuggets found, penalised by wrong optional ones.
    pub recall: f64,
}

/// Score judged nuggets.
///
/// Recall is `matched_essential / (essential + incorrect_optional)`, or 1.0
/// with no essential nuggets. Precision weights optional matches and extra
/// claims by `optional_weight` and is 0.0 when nothing was claimed.
#[allow(clippy::cast_precision_loss)]
pub fn nugget_metrics(results: &[NuggetMatch], extra_claims: usize, optional_weight: f64) -> NuggetMetrics {
    let count = |status: NuggetStatus, outcome: Option<MatchStatus>| {
        results
            .iter()
            .filter(|n| n.status == status && outcome.is_none_or(|o| n.outcome == o))
            .count()
    };

    let essential = count(NuggetStatus::Essential, None);
    let matched_essential = count(NuggetStatus::Essential, Some(MatchStatus::Matched)) as f64;
    let matched_optional = count(NuggetStatus::Optional, Some(MatchStatus::Matched)) as f64;
    let incorrect_optional = count(NuggetStatus::Optional, Some(MatchStatus::Incorrect));

    let recall = if essential == 0 {
        1.0
    } else {
        matched_essential / (essential + incorrect_optional) as f64
    };

    let supported = matched_essential + optional_weight * matched_optional;
    let claimed = supported + optional_weight * extra_claims as f64;
    let precision = if claimed > 0.0 { supported / claimed } else { 0.0 };

    NuggetMetrics { precision, recall }
}

/// Score of one candidate answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NuggetEvaluation {
    /// The matcher's verdict; absent for execution errors.
    pub judgement: Option<NuggetJudgement>,
    /// Rounded scores.
    pub metrics: NuggetMetrics,
}

/// Extracts, matches and scores nuggets with a chat model.
#[derive(Debug, Clone)]
pub struct NuggetEvaluator {
    chat: Arc<dyn ChatModel>,
    config: EvaluationConfig,
    extraction_prompt: String,
    matching_prompt: String,
}

impl NuggetEvaluator {
    /// Create an evaluator with the default prompts.
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self {
            chat,
            config: EvaluationConfig::default(),
            extraction_prompt: DEFAULT_EXTRACTION_PROMPT.to_string(),
            matching_prompt: DEFAULT_MATCHING_PROMPT.to_string(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: EvaluationConfig) -> Self {
        self.config = config;
        self
    }

    /// Use different prompt templates.
    #[must_use]
    pub fn with_prompts<E: Into<String>, M: Into<String>>(mut self, extraction: E, matching: M) -> Self {
        self.extraction_prompt = extraction.into();
        self.matching_prompt = matching.into();
        self
    }

    /// Split a reference answer into nuggets.
    pub async fn extract_nuggets(&self, question: &str, model_answer: &str) -> Result<Vec<Nugget>> {
        let prompt = self
            .extraction_prompt
            .replace("{question}", question)
            .replace("{model_answer}", model_answer);
        debug!("Prompting LLM using: {}", prompt);

        let response = self.chat.chat(&prompt, Some(&extraction_schema())).await?;
        info!("Received response: {}", response);
        let parsed: ExtractionResponse = parse_response(&response)?;
        Ok(parsed.nuggets)
    }

    /// Judge `nuggets` against a candidate answer.
    pub async fn match_nuggets(
        &self,
        question: &str,
        nuggets: &[Nugget],
        candidate_answer: &str,
    ) -> Result<NuggetJudgement> {
        let prompt = self
            .matching_prompt
            .replace("{question}", question)
            .replace("{model_nuggets}", &serde_json::to_string(nuggets)?)
            .replace("{generated_answer}", candidate_answer);
        debug!("Prompting LLM using: {}", prompt);

        let response = self.chat.chat(&prompt, Some(&matching_schema())).await?;
        info!("Received response: {}", response);
        parse_response(&response)
    }

    /// Score rounded to the configured precision.
    pub fn score(&self, judgement: &NuggetJudgement) -> NuggetMetrics {
        let raw = nugget_metrics(
            &judgement.nugget_results,
            judgement.extra_claims.len(),
            self.config.nugget_optional_weight,
        );
        NuggetMetrics {
            precision: self.config.round(raw.precision),
            recall: self.config.round(raw.recall),
        }
    }

    /// Score a candidate answer.
    ///
    /// Answers starting with the execution-error prefix score zero and
    /// never reach the model.
    #[instrument(skip_all, fields(nuggets = nuggets.len()))]
    pub async fn evaluate_answer(
        &self,
        question: &str,
        nuggets: &[Nugget],
        candidate_answer: &str,
    ) -> Result<NuggetEvaluation> {
        if candidate_answer.starts_with(&self.config.execution_error_prefix) {
            info!("Candidate answer is an execution error, scoring zero");
            return Ok(NuggetEvaluation {
                judgement: None,
                metrics: NuggetMetrics::default(),
            });
        }

        let judgement = self.match_nuggets(question, nuggets, candidate_answer).await?;
        let metrics = self.score(&judgement);
        Ok(NuggetEvaluation {
            judgement: Some(judgement),
            metrics,
        })
    }

    /// Score every run entry against the nuggets of its question.
    ///
    /// Entries are paired with questions by id; entries without a known
    /// question are skipped.
    pub async fn evaluate_run(
        &self,
        questions: &[QaEntry],
        run: &[RunEntry],
    ) -> Result<Vec<(String, NuggetEvaluation)>> {
        let mut evaluations = Vec::with_capacity(run.len());
        for entry in run {
            let Some(qa) = questions.iter().find(|qa| qa.id == entry.id) else {
                warn!("No reference answer for question {}", entry.id);
                continue;
            };
            let evaluation = self
                .evaluate_answer(&qa.question, &qa.nuggets, &entry.final_response)
                .await?;
            evaluations.push((entry.id.clone(), evaluation));
        }
        Ok(evaluations)
    }
}

fn parse_response<T: for<'de> Deserialize<'de>>(response: &str) -> Result<T> {
    serde_json::from_str(&strip_code_fences(response))
        .map_err(|e| HybridKgError::llm(format!("Unexpected response format: {e}")))
}

fn nugget_item_schema(with_match: bool) -> Value {
    let mut properties = json!({
        "nugget": {"type": "string"},
        "status": {"type": "string", "enum": ["ESSENTIAL", "OPTIONAL"]}
    });
    let mut required = vec!["nugget", "status"];
    if with_match {
        properties["match"] = json!({"type": "string", "enum": ["MATCHED", "MISSING", "INCORRECT"]});
        required.push("match");
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

/// JSON schema of the extraction response.
pub fn extraction_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "nuggets": {"type": "array", "items": nugget_item_schema(false)}
        },
        "required": ["nuggets"],
        "additionalProperties": false
    })
}

/// JSON schema of the matching response.
pub fn matching_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "nugget_results": {"type": "array", "items": nugget_item_schema(true)},
            "extra_claims": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["nugget_results", "extra_claims"],
        "additionalProperties": false
    })
}
