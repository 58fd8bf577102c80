//! Final natural-language answers from retrieved records.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use hybridkg_core::traits::ChatModel;
use hybridkg_core::{Record, Result};

/// Answer returned when nothing was retrieved.
pub const NO_RECORDS_RESPONSE: &str = "No records could be found. Either the answer is that there are no such entities, or that the context given was insufficient to retrieve the right records. If you believe it is the latter, try rephrasing your question.";

/// Answer returned when too much was retrieved to summarize.
pub const TOO_MANY_RECORDS_RESPONSE: &str = "Too many records were retrieved. Either the answer contains that many entities, or the model gave a bad plan of retrieval. If you believe it is the latter, try entering the question again.";

/// Answer prompt; `{question}` and `{records}` are substituted.
pub const DEFAULT_ANSWER_PROMPT: &str = "You are the final generator in a retrieval system. The user question that has to be answered is:

{question}

Answer this question using the following already retrieved records. You may have to infer the names of certain terms (e.g. 'fm' may represent 'failure mode'). If no records are provided, do not guess and simply say so:

{records}";

/// Render records one JSON object per line.
pub fn records_to_lines(records: &[Record]) -> String {
    records
        .iter()
        .map(|record| Value::Object(record.clone()).to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes the answer shown to the user.
#[derive(Debug, Clone)]
pub struct FinalGenerator {
    chat: Arc<dyn ChatModel>,
    prompt_template: String,
    max_records: usize,
}

impl FinalGenerator {
    /// Create a generator with the default prompt and a 50 record limit.
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self {
            chat,
            prompt_template: DEFAULT_ANSWER_PROMPT.to_string(),
            max_records: 50,
        }
    }

    /// Set the record count above which no model call is made.
    #[must_use]
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    /// Use a different prompt template.
    #[must_use]
    pub fn with_prompt_template<S: Into<String>>(mut self, template: S) -> Self {
        self.prompt_template = template.into();
        self
    }

    /// Answer `question` from `records`.
    pub async fn generate(&self, question: &str, records: &[Record]) -> Result<String> {
        if records.is_empty() {
            info!("No records retrieved, returning pre-written response");
            return Ok(NO_RECORDS_RESPONSE.to_string());
        }
        if records.len() > self.max_records {
            info!(
                "Too many records retrieved: {}, returning pre-written response",
                records.len()
            );
            return Ok(TOO_MANY_RECORDS_RESPONSE.to_string());
        }

        let prompt = self
            .prompt_template
            .replace("{question}", question)
            .replace("{records}", &records_to_lines(records));
        debug!("Prompting LLM using: {}", prompt);

        self.chat.chat(&prompt, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct EchoChat {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatModel for EchoChat {
        async fn chat(&self, prompt: &str, _schema: Option<&Value>) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("answer".to_string())
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_canned_responses_skip_the_model() {
        let chat = Arc::new(EchoChat::default());
        let generator = FinalGenerator::new(chat.clone()).with_max_records(2);

        assert_eq!(generator.generate("q", &[]).await.unwrap(), NO_RECORDS_RESPONSE);
        let many = vec![record(json!({"a": 1})); 3];
        assert_eq!(
            generator.generate("q", &many).await.unwrap(),
            TOO_MANY_RECORDS_RESPONSE
        );
        assert!(chat.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_contains_question_and_records() {
        let chat = Arc::new(EchoChat::default());
        let generator = FinalGenerator::new(chat.clone());

        let records = vec![record(json!({"fm.description": "seal leak", "fm.rpn": 120}))];
        let answer = generator.generate("Which seals leak?", &records).await.unwrap();

        assert_eq!(answer, "answer");
        let prompts = chat.prompts.lock().unwrap();
        assert!(prompts[0].contains("Which seals leak?"));
        assert!(prompts[0].contains(r#"{"fm.description":"seal leak","fm.rpn":120}"#));
    }
}
