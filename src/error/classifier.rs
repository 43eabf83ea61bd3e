//! Rule-based fault classifier
//!
//! Faults are matched against an ordered rule table. The first rule whose
//! status set or message substrings match decides the kind; the order matters
//! because message substrings overlap (a "rate limit timeout" is rate limited,
//! not a timeout). One exception: a rule marked authoritative wins on status
//! alone before the walk starts, so a 401 or 403 stays an auth failure whatever
//! its message says. Substring matching is case-sensitive on the literal
//! needles.

use tracing::debug;

use super::{ErrorClassification, ErrorKind, Fault};

/// Which status codes a rule accepts.
#[derive(Clone, Copy, Debug)]
enum StatusMatch {
    /// The rule never matches on status.
    Never,
    /// Any of the listed codes.
    AnyOf(&'static [i64]),
    /// Half-open range `[start, end)`.
    Range(i64, i64),
}

impl StatusMatch {
    fn matches(self, status: Option<i64>) -> bool {
        let Some(status) = status else {
            return false;
        };
        match self {
            StatusMatch::Never => false,
            StatusMatch::AnyOf(codes) => codes.contains(&status),
            StatusMatch::Range(start, end) => (start..end).contains(&status),
        }
    }
}

/// A single classification rule: a status set and message needles, either of
/// which is sufficient.
#[derive(Clone, Copy, Debug)]
struct ClassificationRule {
    kind: ErrorKind,
    status: StatusMatch,
    needles: &'static [&'static str],
    /// A status match on this rule outranks every message match.
    authoritative: bool,
}

impl ClassificationRule {
    const fn new(kind: ErrorKind, status: StatusMatch, needles: &'static [&'static str]) -> Self {
        Self {
            kind,
            status,
            needles,
            authoritative: false,
        }
    }

    const fn authoritative(self) -> Self {
        Self {
            authoritative: true,
            ..self
        }
    }

    fn matches(&self, status: Option<i64>, message: &str) -> bool {
        self.status.matches(status) || self.needles.iter().any(|n| message.contains(n))
    }
}

/// Rules in precedence order. Anything that falls through is `Unclassified`.
const RULES: [ClassificationRule; 8] = [
    ClassificationRule::new(
        ErrorKind::RateLimited,
        StatusMatch::AnyOf(&[429]),
        &["rate limit", "too many requests"],
    ),
    ClassificationRule::new(
        ErrorKind::AuthFailure,
        StatusMatch::AnyOf(&[401, 403]),
        &["unauthorized", "authentication"],
    )
    .authoritative(),
    ClassificationRule::new(ErrorKind::NotFound, StatusMatch::AnyOf(&[404]), &[]),
    ClassificationRule::new(ErrorKind::UpstreamServerError, StatusMatch::Range(500, 600), &[]),
    ClassificationRule::new(
        ErrorKind::Timeout,
        StatusMatch::Never,
        &["timeout", "ETIMEDOUT", "ECONNRESET"],
    ),
    ClassificationRule::new(
        ErrorKind::ContextTooLong,
        StatusMatch::Never,
        &["context length", "maximum context", "too long"],
    ),
    ClassificationRule::new(
        ErrorKind::ContentBlocked,
        StatusMatch::Never,
        &["content filter", "content policy", "blocked"],
    ),
    ClassificationRule::new(
        ErrorKind::MalformedResponse,
        StatusMatch::Never,
        &["JSON", "parsing", "unexpected token"],
    ),
];

/// Determines the kind of a fault without building the full classification.
pub fn classify_kind(fault: &Fault) -> ErrorKind {
    let message = fault.message_text();
    RULES
        .iter()
        .find(|rule| rule.authoritative && rule.status.matches(fault.status))
        .or_else(|| RULES.iter().find(|rule| rule.matches(fault.status, message)))
        .map(|rule| rule.kind)
        .unwrap_or(ErrorKind::Unclassified)
}

/// Classifies a fault. Never fails; unmatched faults are `Unclassified`.
pub fn classify(fault: &Fault) -> ErrorClassification {
    let kind = classify_kind(fault);
    debug!(kind = %kind, status = ?fault.status, "classified fault");
    ErrorClassification::for_kind(kind)
}
