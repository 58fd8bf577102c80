//! Error types for hybrid retrieval and evaluation.
//!
//! Plan execution failures, collaborator faults and evaluation failures all
//! share one error enum so that callers can surface a single message next to
//! the (possibly partial) plan that was attempted.

use thiserror::Error;

/// Core error type for the hybridkg workspace.
///
/// An empty result set is deliberately absent from this enum: running a plan
/// that matches nothing is a normal terminal state, not a failure.
#[derive(Error, Debug)]
pub enum HybridKgError {
    /// I/O related errors (file reading, network operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV report errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The plan text is not a valid plan. Never retried.
    #[error("Error during plan parsing: {message}")]
    PlanParse {
        /// The raw plan text as produced by the planner
        raw: String,
        /// Parser message
        message: String,
    },

    /// A collaborator call failed while executing a plan step.
    #[error("Error during plan execution at step {step}: {message}")]
    StepExecution {
        /// Zero-based index of the failing step
        step: usize,
        /// Message of the underlying failure
        message: String,
    },

    /// Gold and generated field names diverge and could not be remapped.
    #[error("Alias mapping failed for question {question_id}: {message}")]
    AliasMismatch {
        /// Identifier of the evaluated question
        question_id: String,
        /// Detailed error message
        message: String,
    },

    /// Executing a gold or generated query failed during batch evaluation.
    #[error("Execution failed for question {question_id}: {message}")]
    Execution {
        /// Identifier of the evaluated question
        question_id: String,
        /// Detailed error message
        message: String,
    },

    /// Embedding generation errors
    #[error("Embedding error: {message}")]
    Embedding {
        /// Detailed error message
        message: String,
    },

    /// Graph store query errors
    #[error("Graph store error: {message}")]
    GraphStore {
        /// Detailed error message
        message: String,
    },

    /// Vector store operation errors
    #[error("Vector store error: {message}")]
    VectorStore {
        /// Detailed error message
        message: String,
    },

    /// Chat model errors
    #[error("LLM error: {message}")]
    Llm {
        /// Detailed error message
        message: String,
    },

    /// Configuration validation errors
    #[error("Configuration error: {message}")]
    Configuration {
        /// Detailed error message
        message: String,
    },

    /// Input validation errors
    #[error("Validation error: {message}")]
    Validation {
        /// Detailed error message
        message: String,
    },

    /// Operation timeout errors
    #[error("Timeout: {operation}")]
    Timeout {
        /// Name of the operation that timed out
        operation: String,
    },

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Generic errors from external dependencies
    #[error("External error: {source}")]
    External {
        /// The underlying error
        #[source]
        source: anyhow::Error,
    },
}

impl HybridKgError {
    /// Create a plan parse error carrying the raw plan text.
    pub fn plan_parse<R: Into<String>, M: Into<String>>(raw: R, message: M) -> Self {
        Self::PlanParse {
            raw: raw.into(),
            message: message.into(),
        }
    }

    /// Create a step execution error for the given step index.
    pub fn step_execution<S: Into<String>>(step: usize, message: S) -> Self {
        Self::StepExecution {
            step,
            message: message.into(),
        }
    }

    /// Create an alias mismatch error for one evaluation row.
    pub fn alias_mismatch<Q: Into<String>, M: Into<String>>(question_id: Q, message: M) -> Self {
        Self::AliasMismatch {
            question_id: question_id.into(),
            message: message.into(),
        }
    }

    /// Create a batch execution error for one evaluation row.
    pub fn execution<Q: Into<String>, M: Into<String>>(question_id: Q, message: M) -> Self {
        Self::Execution {
            question_id: question_id.into(),
            message: message.into(),
        }
    }

    /// Create a new embedding error with a message.
    pub fn embedding<S: Into<String>>(message: S) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create a new graph store error with a message.
    pub fn graph_store<S: Into<String>>(message: S) -> Self {
        Self::GraphStore {
            message: message.into(),
        }
    }

    /// Create a new vector store error with a message.
    pub fn vector_store<S: Into<String>>(message: S) -> Self {
        Self::VectorStore {
            message: message.into(),
        }
    }

    /// Create a new LLM error with a message.
    pub fn llm<S: Into<String>>(message: S) -> Self {
        Self::Llm {
            message: message.into(),
        }
    }

    /// Create a new configuration error with a message.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new validation error with a message.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new timeout error with an operation name.
    pub fn timeout<S: Into<String>>(operation: S) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create a new external error from any error that implements `Into<anyhow::Error>`.
    pub fn external<E: Into<anyhow::Error>>(error: E) -> Self {
        Self::External {
            source: error.into(),
        }
    }

    /// Check if this error is retryable.
    ///
    /// Returns `true` for transient errors that might succeed on retry,
    /// such as timeouts or rate limits.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::RateLimit | Self::Io(_))
    }

    /// Check if this error aborts a whole evaluation batch rather than one row.
    #[must_use]
    pub fn aborts_batch(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }
}

/// Convert from `anyhow::Error` to `HybridKgError`.
impl From<anyhow::Error> for HybridKgError {
    fn from(error: anyhow::Error) -> Self {
        Self::External { source: error }
    }
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, HybridKgError>;
