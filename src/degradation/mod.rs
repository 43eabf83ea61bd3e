//! Graceful degradation strategies.
//!
//! A fixed catalogue of recognised failure scenarios, each mapped to a
//! pre-approved substitute behaviour that lets the pipeline continue with
//! reduced output quality instead of halting. Callers consult the registry
//! explicitly when they recognise one of these scenarios.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

/// Error message reported for scenario keys outside the catalogue.
pub const UNKNOWN_SCENARIO: &str = "unknown scenario";

/// A recognised failure scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Literature or web search is unavailable.
    SearchUnavailable,
    /// Only the abstract of a source could be retrieved.
    FullTextUnavailable,
    /// Scraping cross-reference resources failed.
    CrossReferenceScrapeFailed,
    /// The primary language model is unavailable.
    PrimaryModelUnavailable,
    /// Automated validation of the output failed.
    ValidationFailed,
}

impl Scenario {
    pub const ALL: [Scenario; 5] = [
        Scenario::SearchUnavailable,
        Scenario::FullTextUnavailable,
        Scenario::CrossReferenceScrapeFailed,
        Scenario::PrimaryModelUnavailable,
        Scenario::ValidationFailed,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Scenario::SearchUnavailable => "search-unavailable",
            Scenario::FullTextUnavailable => "full-text-unavailable",
            Scenario::CrossReferenceScrapeFailed => "cross-reference-scrape-failed",
            Scenario::PrimaryModelUnavailable => "primary-model-unavailable",
            Scenario::ValidationFailed => "validation-failed",
        }
    }

    /// Scenario names used by older workflow definitions.
    fn legacy_key(self) -> &'static str {
        match self {
            Scenario::SearchUnavailable => "WEB_SEARCH_FAILS",
            Scenario::FullTextUnavailable => "FULL_TEXT_UNAVAILABLE",
            Scenario::CrossReferenceScrapeFailed => "FOAMED_SCRAPING_FAILS",
            Scenario::PrimaryModelUnavailable => "PRIMARY_LLM_UNAVAILABLE",
            Scenario::ValidationFailed => "VALIDATION_FAILS",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Returned when a key names no scenario in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown degradation scenario: {0}")]
pub struct ScenarioParseError(pub String);

impl FromStr for Scenario {
    type Err = ScenarioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.key() == s || scenario.legacy_key() == s)
            .ok_or_else(|| ScenarioParseError(s.to_string()))
    }
}

/// The substitute behaviour a strategy prescribes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FallbackAction {
    UseCachedEvidence,
    ProceedWithAbstract,
    #[serde(rename = "SKIP_CROSSREFS")]
    SkipCrossRefs,
    UseFallbackModel,
    FlagForReview,
}

/// A pre-approved substitute behaviour for one scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DegradationStrategy {
    pub scenario: Scenario,
    pub fallback_action: FallbackAction,
    pub message: &'static str,
    pub continue_workflow: bool,
    pub flag_for_review: bool,
    pub requires_manual_review: bool,
    pub placeholder: Option<&'static str>,
}

impl DegradationStrategy {
    /// The catalogue entry for a scenario.
    pub fn for_scenario(scenario: Scenario) -> Self {
        let base = Self {
            scenario,
            fallback_action: FallbackAction::UseCachedEvidence,
            message: "",
            continue_workflow: true,
            flag_for_review: false,
            requires_manual_review: false,
            placeholder: None,
        };

        match scenario {
            Scenario::SearchUnavailable => Self {
                fallback_action: FallbackAction::UseCachedEvidence,
                message: "Web search unavailable, using cached evidence base",
                ..base
            },
            Scenario::FullTextUnavailable => Self {
                fallback_action: FallbackAction::ProceedWithAbstract,
                message: "Full text not available, proceeding with abstract",
                flag_for_review: true,
                ..base
            },
            Scenario::CrossReferenceScrapeFailed => Self {
                fallback_action: FallbackAction::SkipCrossRefs,
                message: "FOAM resource scraping failed, cross-references will need manual addition",
                placeholder: Some("[FOAMED CROSSREFS NEEDED]"),
                ..base
            },
            Scenario::PrimaryModelUnavailable => Self {
                fallback_action: FallbackAction::UseFallbackModel,
                message: "Primary model unavailable, using fallback",
                ..base
            },
            Scenario::ValidationFailed => Self {
                fallback_action: FallbackAction::FlagForReview,
                message: "Automated validation failed, flagging for manual review",
                requires_manual_review: true,
                ..base
            },
        }
    }
}

/// Outcome of applying a degradation strategy.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DegradationResult {
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<FallbackAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub continue_workflow: bool,
    pub flag_for_review: bool,
    pub requires_manual_review: bool,
    pub placeholder: Option<String>,
    /// The caller's context, echoed back for the host's bookkeeping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DegradationResult {
    fn applied(strategy: DegradationStrategy, context: Map<String, Value>) -> Self {
        Self {
            applied: true,
            strategy: Some(strategy.fallback_action),
            message: Some(strategy.message.to_string()),
            continue_workflow: strategy.continue_workflow,
            flag_for_review: strategy.flag_for_review,
            requires_manual_review: strategy.requires_manual_review,
            placeholder: strategy.placeholder.map(str::to_owned),
            context: Some(context),
            error: None,
        }
    }

    fn unknown() -> Self {
        Self {
            applied: false,
            strategy: None,
            message: None,
            continue_workflow: false,
            flag_for_review: false,
            requires_manual_review: false,
            placeholder: None,
            context: None,
            error: Some(UNKNOWN_SCENARIO.to_string()),
        }
    }
}

/// Looks up a scenario by key and applies its strategy.
///
/// Unknown keys produce a result with `applied == false` and an error message;
/// this never panics.
pub fn apply_degradation(scenario_key: &str, context: Map<String, Value>) -> DegradationResult {
    match scenario_key.parse::<Scenario>() {
        Ok(scenario) => apply_scenario(scenario, context),
        Err(err) => {
            warn!(scenario = scenario_key, "{}", err);
            DegradationResult::unknown()
        }
    }
}

/// Applies the strategy for a known scenario.
pub fn apply_scenario(scenario: Scenario, context: Map<String, Value>) -> DegradationResult {
    let strategy = DegradationStrategy::for_scenario(scenario);
    info!(
        scenario = %scenario,
        continue_workflow = strategy.continue_workflow,
        "{}",
        strategy.message
    );
    DegradationResult::applied(strategy, context)
}
