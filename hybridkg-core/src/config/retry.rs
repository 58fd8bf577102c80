//! Retry policy configuration for collaborator calls.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{HybridKgError, Result};

/// How the delay between attempts grows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay before every retry.
    #[default]
    Fixed,
    /// Delay doubles with every retry.
    Exponential,
}

/// Retry policy applied around any collaborator call.
///
/// The defaults reproduce the embedding client behaviour of retrying a
/// rate-limited call three times after a fixed five second pause.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Number of retries after the first attempt.
    pub max_retries: usize,

    /// Base delay between attempts, in milliseconds.
    pub delay_ms: u64,

    /// Delay growth.
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_ms: 5_000,
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay_ms: 0,
            backoff: Backoff::Fixed,
        }
    }

    /// Set the maximum retries.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Delay to wait before retry number `retry` (zero-based).
    #[must_use]
    pub fn delay_for(&self, retry: usize) -> Duration {
        let base = Duration::from_millis(self.delay_ms);
        match self.backoff {
            Backoff::Fixed => base,
            Backoff::Exponential => {
                let factor = 2_u32.saturating_pow(u32::try_from(retry).unwrap_or(u32::MAX));
                base.saturating_mul(factor)
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_retries > 10 {
            return Err(HybridKgError::configuration(
                "Max retries should not exceed 10",
            ));
        }
        Ok(())
    }
}
