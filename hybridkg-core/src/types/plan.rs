//! Retrieval plans produced by the planner.
//!
//! A plan is an ordered list of steps, each either a structured graph query or
//! a semantic vector search. Only the last step is final.

use serde::{Deserialize, Serialize};

use crate::{HybridKgError, Result};

/// One step of a retrieval plan.
///
/// The wire format tags steps with `"type": "kg"` or `"type": "vector"`;
/// any other tag is rejected when the plan is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Step {
    /// A native graph query, possibly containing extended predicates.
    #[serde(rename = "kg")]
    Structured {
        /// Query text
        query: String,
    },

    /// An embedding similarity search over stored entities.
    #[serde(rename = "vector")]
    Semantic {
        /// Natural-language search phrase
        search: String,
    },
}

impl Step {
    /// Create a structured (graph query) step.
    pub fn structured<S: Into<String>>(query: S) -> Self {
        Self::Structured {
            query: query.into(),
        }
    }

    /// Create a semantic (vector search) step.
    pub fn semantic<S: Into<String>>(search: S) -> Self {
        Self::Semantic {
            search: search.into(),
        }
    }

    /// Short label used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Structured { .. } => "kg",
            Self::Semantic { .. } => "vector",
        }
    }
}

/// An ordered retrieval plan plus the planner's free-text rationale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Steps in execution order; never empty once parsed.
    pub steps: Vec<Step>,

    /// The planner's reasoning.
    #[serde(default)]
    pub reasoning: String,
}

impl Plan {
    /// Create a plan from steps, rejecting an empty step list.
    pub fn new(steps: Vec<Step>) -> Result<Self> {
        if steps.is_empty() {
            return Err(HybridKgError::validation("a plan needs at least one step"));
        }
        Ok(Self {
            steps,
            reasoning: String::new(),
        })
    }

    /// Attach the planner's reasoning.
    #[must_use]
    pub fn with_reasoning<S: Into<String>>(mut self, reasoning: S) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    /// Parse plan text as emitted by the planner.
    ///
    /// Accepts the `{"steps": [...], "reasoning": "..."}` object as well as a
    /// bare step array. Any malformed input, unknown step tag or empty step
    /// list yields [`HybridKgError::PlanParse`] carrying the raw text.
    pub fn parse(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw.trim())
            .map_err(|e| HybridKgError::plan_parse(raw, e.to_string()))?;

        let plan = if value.is_array() {
            let steps: Vec<Step> = serde_json::from_value(value)
                .map_err(|e| HybridKgError::plan_parse(raw, e.to_string()))?;
            Self {
                steps,
                reasoning: String::new(),
            }
        } else {
            serde_json::from_value::<Self>(value)
                .map_err(|e| HybridKgError::plan_parse(raw, e.to_string()))?
        };

        if plan.steps.is_empty() {
            return Err(HybridKgError::plan_parse(raw, "plan contains no steps"));
        }
        Ok(plan)
    }

    /// Index of the final step.
    #[must_use]
    pub fn last_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan has no steps. Parsed plans never do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
