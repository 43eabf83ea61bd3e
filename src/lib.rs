//! Pipeline resilience engine
//!
//! Decides what a multi-stage content-generation pipeline should do when a
//! step fails: retry after a backoff delay, switch to a fallback model, apply
//! a graceful-degradation substitute, or fail. The engine performs no I/O and
//! never sleeps; every decision is returned to the caller to act on.
//!
//! ```
//! use pipeline_resilience::{DecisionEngine, DecisionOptions, EngineConfig, Fault, ResolvedAction};
//!
//! let engine = DecisionEngine::new(EngineConfig::default());
//! let decision = engine.decide(&Fault::status(401), &DecisionOptions::new());
//! assert_eq!(decision.action, ResolvedAction::Fail);
//! ```

pub mod config;
pub mod decision;
pub mod degradation;
pub mod error;
pub mod fallback;
pub mod logging;
pub mod report;
pub mod retry;

pub use config::{ConfigError, EngineConfig};
pub use decision::{Decision, DecisionEngine, DecisionOptions, FailureResponse, ResolvedAction};
pub use degradation::{apply_degradation, DegradationResult, DegradationStrategy, Scenario};
pub use error::{classify, ErrorClassification, ErrorKind, Fault, RecommendedAction};
pub use fallback::FallbackChains;
pub use report::{ErrorContext, ErrorReport};
pub use retry::{JitterSource, RetryDecision, RetryPolicy, StopReason};
