//! Whole-system configuration loading.
//!
//! Configuration files are JSON. Values may reference environment variables
//! as `${VAR_NAME}` or `${VAR_NAME:default}`, and a handful of `HYBRIDKG_*`
//! variables override individual fields after loading.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

use super::{
    EmbeddingModelConfig, EvaluationConfig, ExecutorConfig, LlmConfig, RetryConfig, RewriterConfig,
};
use crate::{HybridKgError, Result};

static ENV_VAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}:]+)(?::([^}]*))?\}").expect("valid env placeholder pattern")
});

/// Complete configuration of a retrieval and evaluation deployment.
///
/// # Examples
///
/// ```rust
/// use hybridkg_core::config::HybridKgConfig;
///
/// let config = HybridKgConfig::from_json_str(
///     r#"{"rewriter": {"semantic_threshold": 0.7}, "executor": {"vector_top_k": 10}}"#,
/// ).unwrap();
/// assert_eq!(config.executor.vector_top_k, Some(10));
/// assert_eq!(config.rewriter.fulltext_index, "entity_text_index");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HybridKgConfig {
    /// Extended query rewriter settings.
    pub rewriter: RewriterConfig,

    /// Plan executor settings.
    pub executor: ExecutorConfig,

    /// Retry policy for collaborator calls.
    pub retry: RetryConfig,

    /// Evaluator settings.
    pub evaluation: EvaluationConfig,

    /// Chat model used for planning and evaluation.
    pub llm: Option<LlmConfig>,

    /// Remote embedding model.
    pub embedding: Option<EmbeddingModelConfig>,
}

impl HybridKgConfig {
    /// Load configuration from a JSON file, substituting `${VAR}` placeholders.
    pub async fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration file: {}", path.display());

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            HybridKgError::configuration(format!(
                "Failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::from_json_str(&content).map_err(|e| {
            HybridKgError::configuration(format!(
                "Invalid configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from JSON text, substituting `${VAR}` placeholders.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let content = substitute_env_variables(content, |name| std::env::var(name).ok());
        serde_json::from_str(&content)
            .map_err(|e| HybridKgError::configuration(format!("Invalid JSON: {e}")))
    }

    /// Apply `HYBRIDKG_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup`.
    ///
    /// Recognized keys are `HYBRIDKG_SEMANTIC_THRESHOLD`,
    /// `HYBRIDKG_FUZZY_THRESHOLD`, `HYBRIDKG_VECTOR_TOP_K`,
    /// `HYBRIDKG_CALL_TIMEOUT_SECONDS` and `HYBRIDKG_LLM_API_KEY`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("HYBRIDKG_SEMANTIC_THRESHOLD") {
            self.rewriter.semantic_threshold =
                parse_override("HYBRIDKG_SEMANTIC_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("HYBRIDKG_FUZZY_THRESHOLD") {
            self.rewriter.fuzzy_threshold = parse_override("HYBRIDKG_FUZZY_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("HYBRIDKG_VECTOR_TOP_K") {
            self.executor.vector_top_k = Some(parse_override("HYBRIDKG_VECTOR_TOP_K", &value)?);
        }
        if let Some(value) = lookup("HYBRIDKG_CALL_TIMEOUT_SECONDS") {
            self.executor.call_timeout_seconds =
                Some(parse_override("HYBRIDKG_CALL_TIMEOUT_SECONDS", &value)?);
        }
        if let Some(value) = lookup("HYBRIDKG_LLM_API_KEY") {
            if let Some(llm) = self.llm.as_mut() {
                llm.api_key = Some(value);
            }
        }
        Ok(())
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.rewriter.validate()?;
        self.executor.validate()?;
        self.retry.validate()?;
        self.evaluation.validate()?;
        if let Some(llm) = &self.llm {
            llm.validate()?;
        }
        if let Some(embedding) = &self.embedding {
            embedding.validate()?;
        }
        Ok(())
    }
}

fn parse_override<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        HybridKgError::configuration(format!("Invalid value '{value}' for {name}: {e}"))
    })
}

/// Replace `${VAR}` and `${VAR:default}` placeholders using `lookup`.
///
/// Unset variables without a default become the empty string.
pub fn substitute_env_variables<F>(content: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_VAR_REGEX
        .replace_all(content, |captures: &regex::Captures<'_>| {
            let default_value = captures.get(2).map_or("", |m| m.as_str());
            lookup(&captures[1]).unwrap_or_else(|| default_value.to_string())
        })
        .into_owned()
}
