//! Configuration for chat and embedding models.

use serde::{Deserialize, Serialize};

use crate::{HybridKgError, Result};

/// Configuration for a chat model used by planning and evaluation.
///
/// # Examples
///
/// ```rust
/// use hybridkg_core::config::LlmConfig;
///
/// let config = LlmConfig::new("openai", "gpt-4o")
///     .with_api_key("your-api-key")
///     .with_temperature(0.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    /// Provider name (e.g., "openai", "anthropic").
    pub provider: String,

    /// Model name or identifier.
    pub model: String,

    /// API key for authentication.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Custom base URL.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Temperature for generation (0.0 to 2.0).
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate.
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl LlmConfig {
    /// Create a new LLM configuration.
    pub fn new<S1: Into<String>, S2: Into<String>>(provider: S1, model: S2) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            api_key: None,
            base_url: None,
            temperature: None,
            max_tokens: None,
            timeout_seconds: None,
        }
    }

    /// Create an `OpenAI` configuration.
    pub fn openai<S1: Into<String>, S2: Into<String>>(model: S1, api_key: S2) -> Self {
        Self::new("openai", model).with_api_key(api_key)
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL.
    #[must_use]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Whether this provider needs an API key.
    #[must_use]
    pub fn requires_api_key(&self) -> bool {
        !matches!(self.provider.as_str(), "local" | "ollama")
    }

    /// Get the effective temperature.
    #[must_use]
    pub fn effective_temperature(&self) -> f32 {
        self.temperature.unwrap_or(0.0)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.provider.is_empty() {
            return Err(HybridKgError::configuration("Provider cannot be empty"));
        }
        if self.model.is_empty() {
            return Err(HybridKgError::configuration("Model cannot be empty"));
        }
        if self.requires_api_key() && self.api_key.is_none() {
            return Err(HybridKgError::configuration(format!(
                "API key is required for provider '{}'",
                self.provider
            )));
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(HybridKgError::configuration(
                    "Temperature must be between 0.0 and 2.0",
                ));
            }
        }
        if self.max_tokens == Some(0) || self.timeout_seconds == Some(0) {
            return Err(HybridKgError::configuration(
                "Max tokens and timeout must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Configuration for a remote embedding model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingModelConfig {
    /// Provider name.
    pub provider: String,

    /// Model name or identifier.
    pub model: String,

    /// API key for authentication.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Expected embedding dimension.
    pub dimension: usize,
}

impl EmbeddingModelConfig {
    /// Create an `OpenAI` embedding configuration.
    pub fn openai<S1: Into<String>, S2: Into<String>>(
        model: S1,
        api_key: S2,
        dimension: usize,
    ) -> Self {
        Self {
            provider: "openai".to_string(),
            model: model.into(),
            api_key: Some(api_key.into()),
            dimension,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.model.is_empty() {
            return Err(HybridKgError::configuration("Model cannot be empty"));
        }
        if self.dimension == 0 {
            return Err(HybridKgError::configuration(
                "Embedding dimension must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_llm_config_builder() {
        let config = LlmConfig::openai("gpt-4o", "sk-test")
            .with_temperature(0.2)
            .with_max_tokens(512)
            .with_timeout(30);

        assert_eq!(config.provider, "openai");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_relative_eq!(config.effective_temperature(), 0.2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_llm_config_validation() {
        assert!(LlmConfig::new("openai", "gpt-4o").validate().is_err());
        assert!(LlmConfig::new("ollama", "llama3").validate().is_ok());
        assert!(
            LlmConfig::openai("gpt-4o", "k")
                .with_temperature(3.0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_embedding_config_validation() {
        let config = EmbeddingModelConfig::openai("text-embedding-3-small", "k", 1536);
        assert!(config.validate().is_ok());
        let config = EmbeddingModelConfig::openai("text-embedding-3-small", "k", 0);
        assert!(config.validate().is_err());
    }
}
