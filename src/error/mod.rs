//! Fault classification module
//!
//! This module maps raw faults raised by pipeline steps onto a closed taxonomy
//! of error kinds, each with a fixed retryability, suggested delay and
//! recommended recovery action.

pub mod classification;
pub mod classifier;
pub mod fault;

// Re-export main types for convenient access
pub use classification::{ErrorClassification, ErrorKind, RecommendedAction};
pub use classifier::{classify, classify_kind};
pub use fault::Fault;
