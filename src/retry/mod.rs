//! Retry policy with exponential backoff.
//!
//! Given a classification and the number of attempts already made, the policy
//! decides whether another attempt is worthwhile and how long the caller
//! should wait first. The policy never sleeps; the delay is a recommendation.

pub mod jitter;

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::ErrorClassification;

pub use jitter::{FixedJitter, JitterSource, SeededJitter, ThreadRngJitter};

/// Why no further attempt should be made.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// The classification says retrying cannot help.
    #[serde(rename = "not retryable")]
    NotRetryable,
    /// The attempt budget is spent.
    #[serde(rename = "max retries exceeded")]
    MaxRetriesExceeded,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::NotRetryable => f.write_str("not retryable"),
            StopReason::MaxRetriesExceeded => f.write_str("max retries exceeded"),
        }
    }
}

/// Outcome of a retry evaluation.
///
/// Serializes to the flat `{shouldRetry, delayMs?, nextAttempt?, maxAttempts,
/// reason?}` record that workflow hosts consume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(into = "RetryDecisionRecord")]
pub enum RetryDecision {
    /// Try again after `delay_ms`.
    Retry {
        delay_ms: u64,
        next_attempt: u32,
        max_attempts: u32,
    },
    /// Give up on this operation.
    Stop {
        reason: StopReason,
        max_attempts: u32,
    },
}

impl RetryDecision {
    pub fn should_retry(&self) -> bool {
        matches!(self, RetryDecision::Retry { .. })
    }

    pub fn delay_ms(&self) -> Option<u64> {
        match self {
            RetryDecision::Retry { delay_ms, .. } => Some(*delay_ms),
            RetryDecision::Stop { .. } => None,
        }
    }

    /// The delay as a `Duration`, for callers that drive their own timers.
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms().map(Duration::from_millis)
    }

    pub fn next_attempt(&self) -> Option<u32> {
        match self {
            RetryDecision::Retry { next_attempt, .. } => Some(*next_attempt),
            RetryDecision::Stop { .. } => None,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        match self {
            RetryDecision::Retry { max_attempts, .. } | RetryDecision::Stop { max_attempts, .. } => {
                *max_attempts
            }
        }
    }

    pub fn reason(&self) -> Option<StopReason> {
        match self {
            RetryDecision::Retry { .. } => None,
            RetryDecision::Stop { reason, .. } => Some(*reason),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RetryDecisionRecord {
    should_retry: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_attempt: Option<u32>,
    max_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<StopReason>,
}

impl From<RetryDecision> for RetryDecisionRecord {
    fn from(decision: RetryDecision) -> Self {
        Self {
            should_retry: decision.should_retry(),
            delay_ms: decision.delay_ms(),
            next_attempt: decision.next_attempt(),
            max_attempts: decision.max_attempts(),
            reason: decision.reason(),
        }
    }
}

/// Backoff settings plus the jitter source used to randomize delays.
#[derive(Clone, Debug)]
pub struct RetryPolicy<J = ThreadRngJitter> {
    /// Attempts allowed when the caller does not say otherwise.
    pub default_max_attempts: u32,
    /// Base delay used when a classification suggests none, in milliseconds.
    pub default_base_delay_ms: u64,
    /// When false, every retry waits exactly the base delay.
    pub exponential: bool,
    /// Growth factor per attempt.
    pub multiplier: f64,
    /// Ceiling applied after jitter, in milliseconds.
    pub max_delay_ms: u64,
    /// Jitter amplitude as a fraction of the raw delay.
    pub jitter_ratio: f64,
    jitter: J,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default(), ThreadRngJitter)
    }
}

impl<J: JitterSource> RetryPolicy<J> {
    /// Builds a policy from engine configuration and a jitter source.
    pub fn from_config(config: &EngineConfig, jitter: J) -> Self {
        Self {
            default_max_attempts: config.default_retries,
            default_base_delay_ms: config.default_retry_delay_ms,
            exponential: config.use_exponential_backoff,
            multiplier: config.backoff_multiplier,
            max_delay_ms: config.max_backoff_ms,
            jitter_ratio: config.jitter_ratio,
            jitter,
        }
    }

    /// Replaces the jitter source, keeping every other setting.
    pub fn with_jitter<K: JitterSource>(self, jitter: K) -> RetryPolicy<K> {
        RetryPolicy {
            default_max_attempts: self.default_max_attempts,
            default_base_delay_ms: self.default_base_delay_ms,
            exponential: self.exponential,
            multiplier: self.multiplier,
            max_delay_ms: self.max_delay_ms,
            jitter_ratio: self.jitter_ratio,
            jitter,
        }
    }

    /// Calculates the delay before the attempt after `attempt`.
    ///
    /// The raw delay is `base * multiplier^(attempt - 1)`; attempt 0 is treated
    /// as attempt 1. Symmetric jitter of `±jitter_ratio` is applied, the result
    /// is rounded to whole milliseconds inside the jitter band, and then capped
    /// at `max_delay_ms`. With exponential backoff disabled
    /// the base delay is returned unmodified.
    pub fn compute_backoff(&self, attempt: u32, base_delay_ms: u64) -> u64 {
        if !self.exponential {
            return base_delay_ms;
        }

        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let raw = (base_delay_ms as f64 * self.multiplier.powi(exponent)).min(f64::MAX);
        let spread = raw * self.jitter_ratio;
        let jitter = spread * self.jitter.sample().clamp(-1.0, 1.0);
        // Rounding must not push the delay outside the jitter band.
        let delay = (raw + jitter)
            .round()
            .max((raw - spread).ceil())
            .min((raw + spread).floor())
            .min(self.max_delay_ms as f64)
            .max(0.0);

        delay.round() as u64
    }

    /// Decides whether to retry using the default attempt budget.
    pub fn decide(&self, classification: &ErrorClassification, attempt: u32) -> RetryDecision {
        self.decide_retry(classification, attempt, self.default_max_attempts)
    }

    /// Decides whether to retry after `attempt` attempts have been made.
    ///
    /// `attempt` is 1-indexed and owned by the caller.
    pub fn decide_retry(
        &self,
        classification: &ErrorClassification,
        attempt: u32,
        max_attempts: u32,
    ) -> RetryDecision {
        if !classification.retryable {
            debug!(kind = %classification.kind, attempt, "not retrying: kind is not retryable");
            return RetryDecision::Stop {
                reason: StopReason::NotRetryable,
                max_attempts,
            };
        }

        if attempt >= max_attempts {
            debug!(
                kind = %classification.kind,
                attempt,
                max_attempts,
                "not retrying: attempt budget exhausted"
            );
            return RetryDecision::Stop {
                reason: StopReason::MaxRetriesExceeded,
                max_attempts,
            };
        }

        let base = classification
            .suggested_delay_ms
            .unwrap_or(self.default_base_delay_ms);
        let delay_ms = self.compute_backoff(attempt, base);
        debug!(kind = %classification.kind, attempt, delay_ms, "scheduling retry");

        RetryDecision::Retry {
            delay_ms,
            next_attempt: attempt.saturating_add(1),
            max_attempts,
        }
    }
}
