//! Chat and embedding model adapters.
//!
//! The siumai-backed clients live behind the `api` feature. The helpers in
//! this module shape prompts and classify provider failures so that retry
//! decorators can tell a throttled request from a broken one.

#[cfg(feature = "api")]
pub mod chat;
#[cfg(feature = "api")]
pub mod embedder;

#[cfg(feature = "api")]
pub use chat::SiumaiChatModel;
#[cfg(feature = "api")]
pub use embedder::SiumaiEmbedder;

use hybridkg_core::HybridKgError;

/// System instruction asking for output conforming to `schema`.
#[must_use]
pub fn structured_output_instruction(schema: &serde_json::Value) -> String {
    let schema_text =
        serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "Respond with a single JSON document that conforms to this JSON schema. \
         Do not wrap it in markdown.\n{schema_text}"
    )
}

/// Map a provider error message to a workspace error.
///
/// Throttling becomes [`HybridKgError::RateLimit`] and stalls become
/// [`HybridKgError::Timeout`], both of which are retried.
pub fn classify_provider_error(operation: &str, message: &str) -> HybridKgError {
    let lowered = message.to_lowercase();
    if lowered.contains("429") || lowered.contains("rate limit") || lowered.contains("too many requests") {
        HybridKgError::RateLimit
    } else if lowered.contains("timed out") || lowered.contains("timeout") {
        HybridKgError::timeout(operation)
    } else {
        HybridKgError::llm(format!("{operation} failed: {message}"))
    }
}
