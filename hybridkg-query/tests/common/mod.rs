//! Hand-written collaborator doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;

use hybridkg_core::traits::{Embedder, GraphStore, VectorStore};
use hybridkg_core::{HybridKgError, QueryParams, Record, Result, VectorMatch, VectorSearch};

pub fn record(value: Value) -> Record {
    value.as_object().cloned().expect("record literal must be an object")
}

pub fn id_records(ids: &[&str]) -> Vec<Record> {
    ids.iter()
        .map(|id| record(serde_json::json!({ "id": id })))
        .collect()
}

/// Graph store answering with the records of the first pattern contained in
/// the query text.
#[derive(Debug, Default)]
pub struct ScriptedGraphStore {
    responses: Vec<(String, Vec<Record>)>,
    failure: Option<String>,
    delay: Option<Duration>,
    pub calls: Mutex<Vec<(String, QueryParams)>>,
}

impl ScriptedGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, pattern: &str, records: Vec<Record>) -> Self {
        self.responses.push((pattern.to_string(), records));
        self
    }

    pub fn fail_with(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }
}

#[async_trait]
impl GraphStore for ScriptedGraphStore {
    async fn query(&self, query: &str, params: &QueryParams) -> Result<Vec<Record>> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), params.clone()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(HybridKgError::graph_store(message.clone()));
        }
        Ok(self
            .responses
            .iter()
            .find(|(pattern, _)| query.contains(pattern.as_str()))
            .map(|(_, records)| records.clone())
            .unwrap_or_default())
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}

/// Vector store over a fixed list of scored matches. Honours
/// `filter_ids`, `threshold` and `top_k` the way a real store would.
#[derive(Debug, Default)]
pub struct ScriptedVectorStore {
    matches: Vec<VectorMatch>,
    delay: Option<Duration>,
    pub searches: Mutex<Vec<VectorSearch>>,
}

impl ScriptedVectorStore {
    pub fn new(matches: Vec<VectorMatch>) -> Self {
        Self {
            matches,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl VectorStore for ScriptedVectorStore {
    async fn search(&self, search: &VectorSearch) -> Result<Vec<VectorMatch>> {
        self.searches.lock().unwrap().push(search.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut found: Vec<VectorMatch> = self
            .matches
            .iter()
            .filter(|m| {
                search
                    .filter_ids
                    .as_ref()
                    .is_none_or(|ids| ids.contains(&m.id))
            })
            .filter(|m| search.threshold.is_none_or(|t| m.score >= t))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.score.total_cmp(&a.score));
        if let Some(k) = search.top_k {
            found.truncate(k);
        }
        Ok(found)
    }
}

/// Embedder returning a constant vector and recording what it embedded.
#[derive(Debug, Default)]
pub struct RecordingEmbedder {
    pub texts: Mutex<Vec<String>>,
}

#[async_trait]
impl Embedder for RecordingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(vec![0.6, 0.8])
    }

    fn dimension(&self) -> usize {
        2
    }

    fn model_name(&self) -> &str {
        "recording"
    }
}
