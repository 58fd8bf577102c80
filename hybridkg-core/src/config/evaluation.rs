//! Configuration for result and nugget evaluation.

use serde::{Deserialize, Serialize};

use crate::{HybridKgError, Result};

/// Tunables shared by the result and nugget evaluators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Weight of optional nuggets in the nugget score.
    pub nugget_optional_weight: f64,

    /// Answers starting with this prefix score zero without any model call.
    pub execution_error_prefix: String,

    /// Decimal places kept in reports.
    pub round_digits: u32,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            nugget_optional_weight: 0.3,
            execution_error_prefix: "EXECUTION ERROR".to_string(),
            round_digits: 4,
        }
    }
}

impl EvaluationConfig {
    /// Set the optional nugget weight.
    #[must_use]
    pub fn with_optional_weight(mut self, weight: f64) -> Self {
        self.nugget_optional_weight = weight;
        self
    }

    /// Round a metric to the configured number of decimals.
    #[must_use]
    pub fn round(&self, value: f64) -> f64 {
        let factor = 10_f64.powi(i32::try_from(self.round_digits).unwrap_or(i32::MAX));
        (value * factor).round() / factor
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.nugget_optional_weight) {
            return Err(HybridKgError::configuration(
                "Optional nugget weight must be between 0.0 and 1.0",
            ));
        }
        if self.round_digits > 12 {
            return Err(HybridKgError::configuration(
                "Round digits should not exceed 12",
            ));
        }
        Ok(())
    }
}
