//! Chat model backed by a siumai client.

use async_trait::async_trait;
use siumai::prelude::*;
use tracing::{debug, instrument};

use hybridkg_core::config::LlmConfig;
use hybridkg_core::traits::ChatModel;
use hybridkg_core::{HybridKgError, Result};

use super::{classify_provider_error, structured_output_instruction};

/// [`ChatModel`] over any provider siumai supports.
///
/// # Examples
///
/// ```rust,no_run
/// use hybridkg_core::config::LlmConfig;
/// use hybridkg_core::traits::ChatModel;
/// use hybridkg_integrations::llm::SiumaiChatModel;
///
/// # async fn example() -> hybridkg_core::Result<()> {
/// let config = LlmConfig::openai("gpt-4o", "your-api-key").with_temperature(0.0);
/// let chat = SiumaiChatModel::from_config(&config).await?;
/// let answer = chat.chat("Which failure modes affect the pump?", None).await?;
/// # Ok(())
/// # }
/// ```
pub struct SiumaiChatModel {
    client: Siumai,
    model: String,
}

impl std::fmt::Debug for SiumaiChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiumaiChatModel")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl SiumaiChatModel {
    /// Build a client for `config.provider`.
    ///
    /// Supported providers are `openai`, `anthropic` and `ollama`.
    pub async fn from_config(config: &LlmConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = match config.provider.as_str() {
            "openai" => {
                let mut builder = Siumai::builder().openai();
                if let Some(api_key) = &config.api_key {
                    builder = builder.api_key(api_key);
                }
                if let Some(base_url) = &config.base_url {
                    builder = builder.base_url(base_url);
                }
                builder.model(&config.model)
            }
            "anthropic" => {
                let mut builder = Siumai::builder().anthropic();
                if let Some(api_key) = &config.api_key {
                    builder = builder.api_key(api_key);
                }
                if let Some(base_url) = &config.base_url {
                    builder = builder.base_url(base_url);
                }
                builder.model(&config.model)
            }
            "ollama" | "local" => Siumai::builder()
                .ollama()
                .base_url(config.base_url.as_deref().unwrap_or("http://localhost:11434"))
                .model(&config.model),
            other => {
                return Err(HybridKgError::configuration(format!(
                    "Unsupported LLM provider: {other}"
                )));
            }
        };

        builder = builder.temperature(config.effective_temperature());
        if let Some(max_tokens) = config.max_tokens {
            builder = builder.max_tokens(max_tokens.try_into().unwrap_or(4096));
        }

        let client = builder.build().await.map_err(|e| {
            HybridKgError::configuration(format!("Failed to create siumai client: {e}"))
        })?;

        Ok(Self {
            client,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ChatModel for SiumaiChatModel {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn chat(&self, prompt: &str, schema: Option<&serde_json::Value>) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(schema) = schema {
            messages.push(ChatMessage::system(structured_output_instruction(schema)).build());
        }
        messages.push(ChatMessage::user(prompt).build());
        debug!("Sending prompt with {} characters", prompt.len());

        let response = self
            .client
            .chat(messages)
            .await
            .map_err(|e| classify_provider_error("chat", &e.to_string()))?;

        match &response.content {
            siumai::MessageContent::Text(text) => Ok(text.clone()),
            _ => Err(HybridKgError::llm("Unsupported content type in LLM response")),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
