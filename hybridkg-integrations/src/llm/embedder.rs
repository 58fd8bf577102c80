//! Remote embedding model backed by siumai's `OpenAI` embeddings client.

use async_trait::async_trait;
use siumai::providers::openai::{OpenAiConfig, OpenAiEmbeddings};
use siumai::traits::EmbeddingCapability;
use tracing::debug;

use hybridkg_core::config::EmbeddingModelConfig;
use hybridkg_core::traits::Embedder;
use hybridkg_core::{HybridKgError, Result};

use super::classify_provider_error;

/// [`Embedder`] calling an `OpenAI`-compatible embeddings endpoint.
pub struct SiumaiEmbedder {
    client: OpenAiEmbeddings,
    model: String,
    dimension: usize,
}

impl std::fmt::Debug for SiumaiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiumaiEmbedder")
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl SiumaiEmbedder {
    /// Create an embedder from configuration.
    pub fn from_config(config: &EmbeddingModelConfig) -> Result<Self> {
        config.validate()?;
        if config.provider != "openai" {
            return Err(HybridKgError::configuration(format!(
                "Unsupported embedding provider: {}",
                config.provider
            )));
        }
        let api_key = config.api_key.as_deref().ok_or_else(|| {
            HybridKgError::configuration("API key is required for the openai embedding provider")
        })?;

        let openai_config = OpenAiConfig::new(api_key).with_model(&config.model);
        Ok(Self {
            client: OpenAiEmbeddings::new(openai_config, reqwest::Client::new()),
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() == self.dimension {
            Ok(())
        } else {
            Err(HybridKgError::embedding(format!(
                "Model {} returned {} dimensions, expected {}",
                self.model,
                embedding.len(),
                self.dimension
            )))
        }
    }
}

#[async_trait]
impl Embedder for SiumaiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(vec![text])
            .await?
            .pop()
            .ok_or_else(|| HybridKgError::embedding("Empty embedding response"))
    }

    async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        debug!("Embedding {} texts with {}", texts.len(), self.model);
        let expected = texts.len();
        let response = self
            .client
            .embed(texts.into_iter().map(str::to_string).collect())
            .await
            .map_err(|e| classify_provider_error("embedding", &e.to_string()))?;

        if response.embeddings.len() != expected {
            return Err(HybridKgError::embedding(format!(
                "Requested {expected} embeddings, received {}",
                response.embeddings.len()
            )));
        }
        for embedding in &response.embeddings {
            self.check_dimension(embedding)?;
        }
        Ok(response.embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
