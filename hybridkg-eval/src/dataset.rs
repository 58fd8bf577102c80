//! Benchmark file formats.
//!
//! The gold store is a JSON array of
//! `{"id", "question", "query", "eval_config": {"optional_columns", "order"}}`
//! objects, the generated store a JSON array of `{"id", "generated_query"}`.
//! Ids may be written as strings or numbers.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::info;

use hybridkg_core::{HybridKgError, Result};

use crate::nugget::Nugget;

/// Sort direction of a declared result order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    /// Ascending.
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    /// Descending.
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

/// Declared result order, written as `[field, "ASC" | "DESC"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec(pub String, pub SortDirection);

impl OrderSpec {
    /// Create an order on `field`.
    pub fn new<S: Into<String>>(field: S, direction: SortDirection) -> Self {
        Self(field.into(), direction)
    }

    /// The field records are ordered by.
    pub fn field(&self) -> &str {
        &self.0
    }

    /// The direction records are ordered in.
    pub fn direction(&self) -> SortDirection {
        self.1
    }
}

/// How a gold query's result is compared.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Fields left out of row matching but still checked for wrong values.
    #[serde(default)]
    pub optional_columns: Vec<String>,

    /// Order the generated result must respect, if any.
    #[serde(default)]
    pub order: Option<OrderSpec>,
}

impl EvalConfig {
    /// Mark columns as optional.
    #[must_use]
    pub fn with_optional_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Require an order.
    #[must_use]
    pub fn with_order(mut self, order: OrderSpec) -> Self {
        self.order = Some(order);
        self
    }
}

/// A benchmark question with its reference query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldQuery {
    /// Question identifier.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    /// The natural-language question, needed to generate queries.
    #[serde(default)]
    pub question: String,

    /// Reference query or plan text.
    #[serde(alias = "ground_truth_query")]
    pub query: String,

    /// Comparison settings.
    #[serde(default)]
    pub eval_config: EvalConfig,
}

impl GoldQuery {
    /// Create a gold query with default comparison settings.
    pub fn new<I, Q, T>(id: I, question: Q, query: T) -> Self
    where
        I: Into<String>,
        Q: Into<String>,
        T: Into<String>,
    {
        Self {
            id: id.into(),
            question: question.into(),
            query: query.into(),
            eval_config: EvalConfig::default(),
        }
    }

    /// Replace the comparison settings.
    #[must_use]
    pub fn with_eval_config(mut self, eval_config: EvalConfig) -> Self {
        self.eval_config = eval_config;
        self
    }
}

/// A query produced by the strategy under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuery {
    /// Question identifier, matching a [`GoldQuery`].
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    /// Generated query or plan text.
    pub generated_query: String,
}

impl GeneratedQuery {
    /// Create a generated entry.
    pub fn new<I: Into<String>, Q: Into<String>>(id: I, generated_query: Q) -> Self {
        Self {
            id: id.into(),
            generated_query: generated_query.into(),
        }
    }
}

/// A question with its reference answer, for nugget scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaEntry {
    /// Question identifier.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    /// The question.
    pub question: String,

    /// Reference answer text.
    pub answer: String,

    /// Nuggets extracted from the reference answer.
    #[serde(default)]
    pub nuggets: Vec<Nugget>,
}

fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

/// Read a JSON array file.
pub async fn load_json<T, P>(path: P) -> Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        HybridKgError::configuration(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let entries: Vec<T> = serde_json::from_str(&content)?;
    info!("Loaded {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Write entries as a JSON array file.
pub async fn save_json<T, P>(path: P, entries: &[T]) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(entries)?;
    tokio::fs::write(path, content).await?;
    info!("Wrote {} entries to {}", entries.len(), path.display());
    Ok(())
}
