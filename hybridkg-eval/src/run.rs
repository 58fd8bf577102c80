//! End-to-end answer runs feeding nugget scoring.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use hybridkg_core::Result;
use hybridkg_query::generator::FinalGenerator;
use hybridkg_query::planner::PlannerRetriever;

use crate::dataset::QaEntry;

/// One answered question of a retrieval run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEntry {
    /// Question identifier.
    pub id: String,
    /// The question.
    pub question: String,
    /// The plan that was executed, as text.
    pub query: String,
    /// The answer shown to the user, or an execution error message.
    pub final_response: String,
    /// Number of records the answer was written from.
    pub retrieved_records: usize,
}

/// Answer every question with a retriever and a final generator.
///
/// A failed retrieval is recorded as `"{error_prefix}: {error}"` so that
/// nugget scoring gives it zero without a model call. A failing answer
/// generation stops the run.
pub async fn answer_questions(
    retriever: &PlannerRetriever,
    generator: &FinalGenerator,
    questions: &[QaEntry],
    error_prefix: &str,
) -> Result<Vec<RunEntry>> {
    let mut run = Vec::with_capacity(questions.len());
    for qa in questions {
        let outcome = retriever.retrieve(&qa.question).await;
        let query = outcome.plan.display_text();

        let (final_response, retrieved_records) = match outcome.error {
            Some(error) => {
                warn!("Retrieval failed for question {}: {}", qa.id, error);
                (format!("{error_prefix}: {error}"), 0)
            }
            None => {
                let answer = generator.generate(&qa.question, &outcome.records).await?;
                (answer, outcome.records.len())
            }
        };

        info!("Answered question {}", qa.id);
        run.push(RunEntry {
            id: qa.id.clone(),
            question: qa.question.clone(),
            query,
            final_response,
            retrieved_records,
        });
    }
    Ok(run)
}
