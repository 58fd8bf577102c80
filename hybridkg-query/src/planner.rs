//! LLM-driven plan generation.

use regex::Regex;
use serde_json::{Value, json};
use std::sync::{Arc, LazyLock};
use tracing::{debug, error, info, instrument};

use hybridkg_core::Result;
use hybridkg_core::traits::ChatModel;

use crate::executor::{AttemptedPlan, PlanExecutor, PlanOutcome};

static CODE_FENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^```[a-zA-Z]*\s*|```$").expect("valid code fence pattern")
});

/// Graph description used when no other schema context is supplied.
pub const DEFAULT_SCHEMA_CONTEXT: &str = r"Entities:
- (Subsystem {name: STRING})
- (Component {name: STRING})
- (SubComponent {name: STRING})
- (FailureMode {description: STRING @match_semantically, occurrence: INT, detection: INT, rpn: INT, severity: INT})
- (FailureEffect {description: STRING @match_semantically})
- (FailureCause {description: STRING @match_semantically})
- (RecommendedAction {description: STRING @match_semantically})  [OPTIONAL]
- (CurrentControls {description: STRING @match_semantically})  [OPTIONAL]

Relationships:
- (Subsystem)-[:HAS_COMPONENT]->(Component)
- (Component)-[:HAS_SUB_COMPONENT]->(SubComponent)
- (SubComponent)-[:HAS_FAILURE_MODE]->(FailureMode)
- (FailureMode)-[:HAS_EFFECT]->(FailureEffect)
- (FailureMode)-[:CAUSED_BY]->(FailureCause)
- (FailureMode)-[:HAS_RECOMMENDED_ACTION]->(RecommendedAction)
- (FailureMode)-[:HAS_CONTROLS]->(CurrentControls)

Every node carries an `external_id` identifier.";

/// Planning prompt; `{schema}` and `{question}` are substituted.
pub const DEFAULT_PLANNING_PROMPT: &str = r#"You decompose natural language questions into sequential retrieval steps over a graph-based knowledge base. There are two kinds of step:
1. "kg": a Cypher query over the graph described below.
2. "vector": an embedding similarity search over node properties marked `@match_semantically`.

Answer with JSON in exactly this shape:

{
    "steps": [
        {"type": "kg", "query": "<Cypher query>"},
        {"type": "vector", "search": "<search phrase>"}
    ],
    "reasoning": "<your thought process>"
}

Graph schema:

{schema}

Question:

{question}

Rules:
1. Use a single step unless the question needs more.
2. A non-final Cypher step must end with `RETURN DISTINCT <alias>.external_id AS id`.
3. Every step after the first receives the previous result as full nodes bound to `n`; match on `(n:Type)` and never filter ids yourself.
4. The final Cypher step returns named properties such as `RETURN fm.description, fm.rpn`, never whole nodes.
5. A step feeding a vector search must return nodes that have a `@match_semantically` property.
6. Names in the question may differ in spelling or case from stored values.
7. Text properties may be compared with FUZZY_MATCH(<var>.<property>, '<phrase>') and SEMANTIC_MATCH(<var>.<property>, '<phrase>') in clause-level WHERE clauses. Do not wrap the property in a function.
8. Do not use $ parameters."#;

/// JSON schema the planner's response must follow.
pub fn plan_response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "steps": {
                "type": "array",
                "items": {
                    "anyOf": [
                        {
                            "type": "object",
                            "properties": {
                                "type": {"const": "kg"},
                                "query": {"type": "string"}
                            },
                            "required": ["type", "query"],
                            "additionalProperties": false
                        },
                        {
                            "type": "object",
                            "properties": {
                                "type": {"const": "vector"},
                                "search": {"type": "string"}
                            },
                            "required": ["type", "search"],
                            "additionalProperties": false
                        }
                    ]
                }
            },
            "reasoning": {"type": "string"}
        },
        "required": ["steps", "reasoning"],
        "additionalProperties": false
    })
}

/// Remove markdown code fences a model may wrap its answer in.
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE_REGEX.replace_all(text, "").trim().to_string()
}

/// Turns a question into raw plan text using a chat model.
#[derive(Debug, Clone)]
pub struct PlanGenerator {
    chat: Arc<dyn ChatModel>,
    schema_context: String,
    prompt_template: String,
}

impl PlanGenerator {
    /// Create a generator with the default prompt and schema context.
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self {
            chat,
            schema_context: DEFAULT_SCHEMA_CONTEXT.to_string(),
            prompt_template: DEFAULT_PLANNING_PROMPT.to_string(),
        }
    }

    /// Describe a different graph.
    #[must_use]
    pub fn with_schema_context<S: Into<String>>(mut self, schema_context: S) -> Self {
        self.schema_context = schema_context.into();
        self
    }

    /// Use a different prompt template.
    #[must_use]
    pub fn with_prompt_template<S: Into<String>>(mut self, template: S) -> Self {
        self.prompt_template = template.into();
        self
    }

    /// Build the planning prompt for a question.
    pub fn build_prompt(&self, question: &str) -> String {
        self.prompt_template
            .replace("{schema}", &self.schema_context)
            .replace("{question}", question)
    }

    /// Ask the model for a plan and return its text, unparsed.
    pub async fn generate_plan(&self, question: &str) -> Result<String> {
        let prompt = self.build_prompt(question);
        debug!("Prompting LLM using: {}", prompt);

        let schema = plan_response_schema();
        let response = self.chat.chat(&prompt, Some(&schema)).await?;
        let plan_text = strip_code_fences(&response);

        info!("Generated plan:\n{}", plan_text);
        Ok(plan_text)
    }
}

/// Plan generation followed by plan execution.
#[derive(Debug, Clone)]
pub struct PlannerRetriever {
    generator: PlanGenerator,
    executor: PlanExecutor,
}

impl PlannerRetriever {
    /// Create a retriever.
    pub fn new(generator: PlanGenerator, executor: PlanExecutor) -> Self {
        Self {
            generator,
            executor,
        }
    }

    /// Get the executor.
    pub fn executor(&self) -> &PlanExecutor {
        &self.executor
    }

    /// Answer a question with records.
    ///
    /// A failed model call is reported the same way as a plan that fails to
    /// parse, with empty plan text.
    #[instrument(skip(self))]
    pub async fn retrieve(&self, question: &str) -> PlanOutcome {
        info!("Question given: {}", question);
        match self.generator.generate_plan(question).await {
            Ok(plan_text) => self.executor.execute(&plan_text).await,
            Err(e) => {
                error!("Plan generation failed: {}", e);
                PlanOutcome {
                    plan: AttemptedPlan::Unparsed(String::new()),
                    records: Vec::new(),
                    error: Some(e),
                }
            }
        }
    }
}
