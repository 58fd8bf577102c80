//! LLM-assisted field alias mapping.
//!
//! A generated query may name its columns differently from the gold query
//! (`fm.description` vs `description`). Before scoring, a chat model maps
//! generated names onto gold names.

use serde_json::{Map, Value, json};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

use hybridkg_core::traits::ChatModel;
use hybridkg_core::{HybridKgError, Record, Result};
use hybridkg_query::planner::strip_code_fences;

/// Mapping prompt; `{gold_aliases}` and `{candidate_aliases}` are substituted.
pub const DEFAULT_ALIAS_PROMPT: &str = r#"Two queries answering the same question returned columns with different names.

Reference columns: {gold_aliases}
Candidate columns: {candidate_aliases}

Map each candidate column to the reference column holding the same information. Leave out candidate columns with no counterpart. Answer with a JSON object only, for example {"fm.description": "description"}."#;

/// Whether two field-name sets need remapping before scoring.
///
/// Sets where one contains the other are compared as they are.
pub fn needs_alias_mapping<'a, G, C>(gold_fields: G, generated_fields: C) -> bool
where
    G: IntoIterator<Item = &'a String>,
    C: IntoIterator<Item = &'a String>,
{
    let gold: BTreeSet<&String> = gold_fields.into_iter().collect();
    let generated: BTreeSet<&String> = generated_fields.into_iter().collect();
    !gold.is_subset(&generated) && !generated.is_subset(&gold)
}

/// Rename record fields; names absent from `mapping` are kept.
pub fn apply_alias_mapping(records: Vec<Record>, mapping: &HashMap<String, String>) -> Vec<Record> {
    records
        .into_iter()
        .map(|record| {
            record
                .into_iter()
                .map(|(field, value)| {
                    let renamed = mapping.get(&field).cloned().unwrap_or(field);
                    (renamed, value)
                })
                .collect::<Map<String, Value>>()
        })
        .collect()
}

/// Asks a chat model how generated column names map to gold column names.
#[derive(Debug, Clone)]
pub struct AliasMapper {
    chat: Arc<dyn ChatModel>,
    prompt_template: String,
}

impl AliasMapper {
    /// Create a mapper with the default prompt.
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self {
            chat,
            prompt_template: DEFAULT_ALIAS_PROMPT.to_string(),
        }
    }

    /// Use a different prompt template.
    #[must_use]
    pub fn with_prompt_template<S: Into<String>>(mut self, template: S) -> Self {
        self.prompt_template = template.into();
        self
    }

    /// Predict a generated-to-gold name mapping.
    ///
    /// Both a failed model call and output that is not a JSON object of
    /// strings yield [`HybridKgError::AliasMismatch`].
    pub async fn predict(
        &self,
        question_id: &str,
        gold_aliases: &[String],
        candidate_aliases: &[String],
    ) -> Result<HashMap<String, String>> {
        let prompt = self
            .prompt_template
            .replace("{gold_aliases}", &json!(gold_aliases).to_string())
            .replace("{candidate_aliases}", &json!(candidate_aliases).to_string());
        debug!("Prompting LLM using {}", prompt);

        let response = self
            .chat
            .chat(&prompt, None)
            .await
            .map_err(|e| HybridKgError::alias_mismatch(question_id, e.to_string()))?;
        debug!("LLM response: {}", response);

        parse_mapping(&response)
            .map_err(|message| HybridKgError::alias_mismatch(question_id, message))
    }
}

fn parse_mapping(response: &str) -> std::result::Result<HashMap<String, String>, String> {
    let value: Value = serde_json::from_str(&strip_code_fences(response))
        .map_err(|e| format!("Mapping is not valid JSON: {e}"))?;
    let Value::Object(object) = value else {
        return Err("Mapping is not a JSON object".to_string());
    };
    object
        .into_iter()
        .map(|(from, to)| match to {
            Value::String(to) => Ok((from, to)),
            other => Err(format!("Mapping for '{from}' is not a string: {other}")),
        })
        .collect()
}
