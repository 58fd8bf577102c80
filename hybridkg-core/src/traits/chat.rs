//! Chat model trait.

use async_trait::async_trait;

use crate::Result;

/// Sends a single-turn prompt to a chat model.
///
/// Planning, alias mapping, nugget extraction and nugget matching all go
/// through this trait. When `schema` is given the model is asked for JSON
/// conforming to that JSON schema; callers still validate what comes back.
#[async_trait]
pub trait ChatModel: Send + Sync + std::fmt::Debug {
    /// Prompt the model and return its text response.
    async fn chat(&self, prompt: &str, schema: Option<&serde_json::Value>) -> Result<String>;

    /// Get the model identifier, used in logs.
    fn model_name(&self) -> &str;
}
