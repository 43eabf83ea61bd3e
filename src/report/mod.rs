//! Enriched error records for the host's logging collaborator.
//!
//! The engine never writes these anywhere; it hands them to the caller, which
//! stores or ships them as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{classify, ErrorClassification, ErrorKind, Fault, RecommendedAction};

/// Pass-through identifiers describing where a fault happened.
///
/// None of these influence decisions; they only enrich reports and log events.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub request_id: Option<String>,
    pub workflow_name: Option<String>,
    pub node_name: Option<String>,
    pub attempt_number: Option<u32>,
    pub input_summary: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
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

    pub fn with_attempt_number(mut self, attempt_number: u32) -> Self {
        self.attempt_number = Some(attempt_number);
        self
    }

    pub fn with_input_summary(mut self, input_summary: impl Into<String>) -> Self {
        self.input_summary = Some(input_summary.into());
        self
    }
}

/// A fault formatted for logging or storage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Unique id of the form `err_<32 hex digits>`.
    pub error_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    pub stack: Option<String>,
    pub classification: ErrorClassification,
    pub context: ErrorContext,
    pub retryable: bool,
    pub suggested_action: RecommendedAction,
}

impl ErrorReport {
    /// Classifies the fault and builds a report for it.
    pub fn new(fault: &Fault, context: ErrorContext) -> Self {
        Self::with_classification(fault, classify(fault), context)
    }

    /// Builds a report for a fault that has already been classified.
    pub fn with_classification(
        fault: &Fault,
        classification: ErrorClassification,
        context: ErrorContext,
    ) -> Self {
        Self {
            error_id: generate_error_id(),
            timestamp: Utc::now(),
            kind: classification.kind,
            message: fault.to_string(),
            stack: fault.stack.clone(),
            classification,
            context,
            retryable: classification.retryable,
            suggested_action: classification.action,
        }
    }
}

/// Generates a unique error id.
pub fn generate_error_id() -> String {
    format!("err_{}", Uuid::new_v4().simple())
}
