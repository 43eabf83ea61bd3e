//! Decision orchestrator.
//!
//! The single entry point a pipeline step calls when something fails. It
//! classifies the fault, evaluates the retry policy and, once retries are
//! exhausted for a transient fault, consults the fallback chains. Every call is
//! independent: attempt counters and the current model are threaded through by
//! the caller.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::{classify, ErrorClassification, Fault, RecommendedAction};
use crate::fallback::FallbackChains;
use crate::report::{ErrorContext, ErrorReport};
use crate::retry::{JitterSource, RetryDecision, RetryPolicy, ThreadRngJitter};

/// Per-call inputs supplied by the workflow host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecisionOptions {
    /// Attempts already made for this operation (1-indexed).
    pub attempt_number: u32,
    /// Attempt budget; the configured default applies when absent.
    pub max_attempts: Option<u32>,
    /// Prefer degraded output over failing the step.
    pub continue_on_error: bool,
    /// The model the failed operation ran against.
    pub current_model_id: Option<String>,
    pub request_id: Option<String>,
    pub workflow_name: Option<String>,
    pub node_name: Option<String>,
    pub input_summary: Option<String>,
}

impl Default for DecisionOptions {
    fn default() -> Self {
        Self {
            attempt_number: 1,
            max_attempts: None,
            continue_on_error: false,
            current_model_id: None,
            request_id: None,
            workflow_name: None,
            node_name: None,
            input_summary: None,
        }
    }
}

impl DecisionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attempt_number(mut self, attempt_number: u32) -> Self {
        self.attempt_number = attempt_number;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    pub fn with_current_model(mut self, model_id: impl Into<String>) -> Self {
        self.current_model_id = Some(model_id.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_workflow_name(mut self, workflow_name: impl Into<String>) -> Self {
        self.workflow_name = Some(workflow_name.into());
        self
    }

    pub fn with_node_name(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = Some(node_name.into());
        self
    }

    pub fn with_input_summary(mut self, input_summary: impl Into<String>) -> Self {
        self.input_summary = Some(input_summary.into());
        self
    }

    /// The pass-through identifiers as a report context.
    pub fn error_context(&self) -> ErrorContext {
        ErrorContext {
            request_id: self.request_id.clone(),
            workflow_name: self.workflow_name.clone(),
            node_name: self.node_name.clone(),
            attempt_number: Some(self.attempt_number),
            input_summary: self.input_summary.clone(),
        }
    }
}

/// What the caller should do next.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolvedAction {
    /// Wait `delay_ms`, then run attempt `next_attempt`.
    #[serde(rename_all = "camelCase")]
    Retry { delay_ms: u64, next_attempt: u32 },
    /// Re-run the step against `fallback_model`.
    #[serde(rename_all = "camelCase")]
    UseFallback { fallback_model: String },
    /// Proceed with degraded output, keeping the error on record.
    ContinueWithError,
    /// Halt this unit of work.
    Fail,
}

impl ResolvedAction {
    pub fn name(&self) -> &'static str {
        match self {
            ResolvedAction::Retry { .. } => "RETRY",
            ResolvedAction::UseFallback { .. } => "USE_FALLBACK",
            ResolvedAction::ContinueWithError => "CONTINUE_WITH_ERROR",
            ResolvedAction::Fail => "FAIL",
        }
    }
}

/// The terminal record returned for one failure event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub classification: ErrorClassification,
    pub retry: RetryDecision,
    #[serde(flatten)]
    pub action: ResolvedAction,
}

impl Decision {
    pub fn fallback_model(&self) -> Option<&str> {
        match &self.action {
            ResolvedAction::UseFallback { fallback_model } => Some(fallback_model.as_str()),
            _ => None,
        }
    }

    pub fn delay_ms(&self) -> Option<u64> {
        match self.action {
            ResolvedAction::Retry { delay_ms, .. } => Some(delay_ms),
            _ => None,
        }
    }
}

/// Everything a host step emits after a failure: the decision plus the
/// enriched error record for its log.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FailureResponse {
    pub success: bool,
    pub error: ErrorReport,
    #[serde(flatten)]
    pub decision: Decision,
}

/// Composes classification, retry policy and fallback resolution.
#[derive(Clone, Debug)]
pub struct DecisionEngine<J = ThreadRngJitter> {
    retry: RetryPolicy<J>,
    fallbacks: FallbackChains,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl DecisionEngine {
    /// Creates an engine that draws jitter from the thread-local generator.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_jitter(config, ThreadRngJitter)
    }
}

impl<J: JitterSource> DecisionEngine<J> {
    /// Creates an engine with an explicit jitter source.
    pub fn with_jitter(config: EngineConfig, jitter: J) -> Self {
        Self {
            retry: RetryPolicy::from_config(&config, jitter),
            fallbacks: config.model_fallbacks,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy<J> {
        &self.retry
    }

    pub fn fallbacks(&self) -> &FallbackChains {
        &self.fallbacks
    }

    /// Decides what the pipeline should do about `fault`.
    pub fn decide(&self, fault: &Fault, options: &DecisionOptions) -> Decision {
        let classification = classify(fault);
        let max_attempts = options
            .max_attempts
            .unwrap_or(self.retry.default_max_attempts);
        let retry = self
            .retry
            .decide_retry(&classification, options.attempt_number, max_attempts);
        let action = self.resolve_action(&classification, &retry, options);

        let decision = Decision {
            classification,
            retry,
            action,
        };
        log_decision(&decision, options);
        decision
    }

    /// Decides and also builds the error report for the host's log.
    pub fn handle(&self, fault: &Fault, options: &DecisionOptions) -> FailureResponse {
        let decision = self.decide(fault, options);
        let error =
            ErrorReport::with_classification(fault, decision.classification, options.error_context());

        FailureResponse {
            success: false,
            error,
            decision,
        }
    }

    fn resolve_action(
        &self,
        classification: &ErrorClassification,
        retry: &RetryDecision,
        options: &DecisionOptions,
    ) -> ResolvedAction {
        if let RetryDecision::Retry {
            delay_ms,
            next_attempt,
            ..
        } = *retry
        {
            return ResolvedAction::Retry {
                delay_ms,
                next_attempt,
            };
        }

        // Only the head of the chain is consulted. Callers move down a chain
        // by passing the fallback back in as the current model.
        if classification.action == RecommendedAction::RetryWithBackoff {
            let fallback = options
                .current_model_id
                .as_deref()
                .and_then(|model| self.fallbacks.next_fallback(model, 0));
            if let Some(fallback_model) = fallback {
                return ResolvedAction::UseFallback {
                    fallback_model: fallback_model.to_string(),
                };
            }
        }

        if options.continue_on_error {
            ResolvedAction::ContinueWithError
        } else {
            ResolvedAction::Fail
        }
    }
}

fn log_decision(decision: &Decision, options: &DecisionOptions) {
    let kind = decision.classification.kind;
    let request_id = options.request_id.as_deref().unwrap_or("-");
    let node = options.node_name.as_deref().unwrap_or("-");

    match &decision.action {
        ResolvedAction::Retry {
            delay_ms,
            next_attempt,
        } => info!(
            %kind,
            request_id,
            node,
            delay_ms,
            next_attempt,
            "retrying after failure"
        ),
        ResolvedAction::UseFallback { fallback_model } => info!(
            %kind,
            request_id,
            node,
            current_model = options.current_model_id.as_deref().unwrap_or("-"),
            fallback_model = fallback_model.as_str(),
            "switching to fallback model"
        ),
        ResolvedAction::ContinueWithError | ResolvedAction::Fail => warn!(
            %kind,
            request_id,
            node,
            attempt = options.attempt_number,
            action = decision.action.name(),
            "giving up on step"
        ),
    }
}
