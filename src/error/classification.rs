//! Error classification types for the decision engine
//!
//! This module provides the closed taxonomy a fault is mapped to. Every
//! [`ErrorKind`] has exactly one retry profile (retryability, suggested delay,
//! recommended action), derived by an exhaustive match so that adding a kind
//! is a compile-time checked change.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The category a fault falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Provider rejected the request for exceeding a rate limit (HTTP 429).
    RateLimited,
    /// Credentials were missing, invalid, or lacked permission (HTTP 401/403).
    AuthFailure,
    /// The requested resource does not exist (HTTP 404).
    NotFound,
    /// Provider-side failure (HTTP 5xx).
    UpstreamServerError,
    /// The request timed out or the connection was reset.
    Timeout,
    /// The prompt exceeded the model's context window.
    ContextTooLong,
    /// A content filter or policy blocked the request.
    ContentBlocked,
    /// The response could not be parsed.
    MalformedResponse,
    /// Nothing more specific matched.
    Unclassified,
}

impl ErrorKind {
    /// All kinds, in classification precedence order.
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::RateLimited,
        ErrorKind::AuthFailure,
        ErrorKind::NotFound,
        ErrorKind::UpstreamServerError,
        ErrorKind::Timeout,
        ErrorKind::ContextTooLong,
        ErrorKind::ContentBlocked,
        ErrorKind::MalformedResponse,
        ErrorKind::Unclassified,
    ];

    /// Stable kebab-case name, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "rate-limited",
            ErrorKind::AuthFailure => "auth-failure",
            ErrorKind::NotFound => "not-found",
            ErrorKind::UpstreamServerError => "upstream-server-error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ContextTooLong => "context-too-long",
            ErrorKind::ContentBlocked => "content-blocked",
            ErrorKind::MalformedResponse => "malformed-response",
            ErrorKind::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the classifier recommends doing about a fault, before attempt counts
/// are taken into account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendedAction {
    /// Retry with exponential backoff; the fault is transient.
    RetryWithBackoff,
    /// Stop now; retrying cannot help.
    FailImmediately,
    /// Skip the step or substitute other input.
    SkipOrFallback,
    /// Shrink the prompt before trying again.
    ReduceInputSize,
    /// Rewrite the input so it passes content policy.
    ModifyInput,
    /// Retry, or switch to a more lenient response parser.
    RetryOrFallbackParser,
    /// Retry a few times, then give up.
    RetryThenFail,
}

impl RecommendedAction {
    /// Returns true if this action involves trying the same operation again.
    pub fn is_retry(self) -> bool {
        matches!(
            self,
            RecommendedAction::RetryWithBackoff
                | RecommendedAction::RetryOrFallbackParser
                | RecommendedAction::RetryThenFail
        )
    }

    /// Stable SCREAMING_SNAKE_CASE name, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            RecommendedAction::RetryWithBackoff => "RETRY_WITH_BACKOFF",
            RecommendedAction::FailImmediately => "FAIL_IMMEDIATELY",
            RecommendedAction::SkipOrFallback => "SKIP_OR_FALLBACK",
            RecommendedAction::ReduceInputSize => "REDUCE_INPUT_SIZE",
            RecommendedAction::ModifyInput => "MODIFY_INPUT",
            RecommendedAction::RetryOrFallbackParser => "RETRY_OR_FALLBACK_PARSER",
            RecommendedAction::RetryThenFail => "RETRY_THEN_FAIL",
        }
    }
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The taxonomy entry a fault was mapped to.
///
/// Construct with [`ErrorClassification::for_kind`]; the profile for each kind
/// is fixed, which keeps `retryable == false` paired with an absent delay and
/// a non-retry action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorClassification {
    /// The category of the fault.
    pub kind: ErrorKind,
    /// Whether retrying the same operation may succeed.
    pub retryable: bool,
    /// Base delay before the first retry, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_delay_ms: Option<u64>,
    /// Recommended recovery action.
    pub action: RecommendedAction,
}

impl ErrorClassification {
    /// Returns the fixed profile for a kind.
    pub fn for_kind(kind: ErrorKind) -> Self {
        let (retryable, suggested_delay_ms, action) = match kind {
            ErrorKind::RateLimited => (true, Some(30_000), RecommendedAction::RetryWithBackoff),
            ErrorKind::AuthFailure => (false, None, RecommendedAction::FailImmediately),
            ErrorKind::NotFound => (false, None, RecommendedAction::SkipOrFallback),
            ErrorKind::UpstreamServerError => {
                (true, Some(10_000), RecommendedAction::RetryWithBackoff)
            }
            ErrorKind::Timeout => (true, Some(5_000), RecommendedAction::RetryWithBackoff),
            ErrorKind::ContextTooLong => (false, None, RecommendedAction::ReduceInputSize),
            ErrorKind::ContentBlocked => (false, None, RecommendedAction::ModifyInput),
            ErrorKind::MalformedResponse => {
                (true, Some(1_000), RecommendedAction::RetryOrFallbackParser)
            }
            ErrorKind::Unclassified => (true, Some(5_000), RecommendedAction::RetryThenFail),
        };

        Self {
            kind,
            retryable,
            suggested_delay_ms,
            action,
        }
    }

    /// Returns true if the classifier considers this fault transient and the
    /// category is inherently retryable with backoff.
    pub fn is_transient(&self) -> bool {
        self.action == RecommendedAction::RetryWithBackoff
    }
}

impl From<ErrorKind> for ErrorClassification {
    fn from(kind: ErrorKind) -> Self {
        Self::for_kind(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_retryable_kinds_have_no_delay_and_no_retry_action() {
        for kind in ErrorKind::ALL {
            let classification = ErrorClassification::for_kind(kind);
            if !classification.retryable {
                assert!(
                    classification.suggested_delay_ms.is_none(),
                    "{kind} should not suggest a delay"
                );
                assert!(
                    !classification.action.is_retry(),
                    "{kind} should not recommend a retry action"
                );
            }
        }
    }

    #[test]
    fn test_retryable_kinds_suggest_a_delay() {
        for kind in ErrorKind::ALL {
            let classification = ErrorClassification::for_kind(kind);
            if classification.retryable {
                assert!(classification.suggested_delay_ms.is_some(), "{kind}");
                assert!(classification.action.is_retry(), "{kind}");
            }
        }
    }

    #[test]
    fn test_profiles() {
        let rate = ErrorClassification::for_kind(ErrorKind::RateLimited);
        assert!(rate.retryable);
        assert_eq!(rate.suggested_delay_ms, Some(30_000));
        assert_eq!(rate.action, RecommendedAction::RetryWithBackoff);

        let parse = ErrorClassification::for_kind(ErrorKind::MalformedResponse);
        assert_eq!(parse.suggested_delay_ms, Some(1_000));
        assert_eq!(parse.action, RecommendedAction::RetryOrFallbackParser);
        assert!(!parse.is_transient());

        let unknown = ErrorClassification::from(ErrorKind::Unclassified);
        assert_eq!(unknown.suggested_delay_ms, Some(5_000));
        assert_eq!(unknown.action, RecommendedAction::RetryThenFail);
    }

    #[test]
    fn test_display_matches_serialized_names() {
        for kind in ErrorKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }

        let json = serde_json::to_string(&RecommendedAction::RetryOrFallbackParser).unwrap();
        assert_eq!(json, "\"RETRY_OR_FALLBACK_PARSER\"");
        assert_eq!(
            RecommendedAction::FailImmediately.to_string(),
            "FAIL_IMMEDIATELY"
        );
    }

    #[test]
    fn test_classification_serializes_camel_case_and_omits_absent_delay() {
        let auth = ErrorClassification::for_kind(ErrorKind::AuthFailure);
        let value = serde_json::to_value(auth).unwrap();
        assert_eq!(value["kind"], "auth-failure");
        assert_eq!(value["retryable"], false);
        assert_eq!(value["action"], "FAIL_IMMEDIATELY");
        assert!(value.get("suggestedDelayMs").is_none());

        let timeout = ErrorClassification::for_kind(ErrorKind::Timeout);
        let value = serde_json::to_value(timeout).unwrap();
        assert_eq!(value["suggestedDelayMs"], 5000);
    }
}
