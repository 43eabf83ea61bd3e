//! The fault value a pipeline step observes.
//!
//! A fault is loose: hosts hand over whatever their step raised,
//! which may be a provider error object, a bare string, or a Rust error. All the
//! classifier needs is an optional message and an optional numeric status.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Field names that may carry a numeric status, in the order they are consulted.
const STATUS_FIELDS: [&str; 3] = ["statusCode", "status", "code"];

/// A raised error as seen by the decision engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fault {
    /// Human-readable error message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Numeric status or error code (typically an HTTP status).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    /// Stack trace or backtrace text, carried through to error reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl Fault {
    /// Creates an empty fault with neither message nor status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fault carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new().with_message(message)
    }

    /// Creates a fault carrying only a status code.
    pub fn status(status: i64) -> Self {
        Self::new().with_status(status)
    }

    /// Sets the message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the status code.
    pub fn with_status(mut self, status: i64) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the stack trace.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Builds a fault from any Rust error, using its `Display` output as the message.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        Self::message(error.to_string())
    }

    /// Builds a fault from a JSON value as produced by a workflow host.
    ///
    /// Objects contribute `message`, `stack` and the first truthy numeric value
    /// among `statusCode`, `status` and `code`. A bare string becomes the
    /// message; any other value is rendered as message text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                let message = match map.get("message") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(other) => Some(other.to_string()),
                };
                let status = STATUS_FIELDS
                    .iter()
                    .find_map(|field| map.get(*field).and_then(truthy_status));
                let stack = map.get("stack").and_then(Value::as_str).map(str::to_owned);

                Self {
                    message,
                    status,
                    stack,
                }
            }
            Value::String(s) => Self::message(s.clone()),
            Value::Null => Self::new(),
            other => Self::message(other.to_string()),
        }
    }

    /// The message text the classifier matches against; empty when absent.
    pub fn message_text(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}

/// Numeric, integral and non-zero; anything else does not count as a status.
fn truthy_status(value: &Value) -> Option<i64> {
    let status = value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.is_finite())
            .map(|f| f as i64)
    })?;
    (status != 0).then_some(status)
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.message, self.status) {
            (Some(message), _) => f.write_str(message),
            (None, Some(status)) => write!(f, "status {}", status),
            (None, None) => f.write_str("unknown fault"),
        }
    }
}

impl<'de> Deserialize<'de> for Fault {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

impl From<&str> for Fault {
    fn from(message: &str) -> Self {
        Self::message(message)
    }
}

impl From<String> for Fault {
    fn from(message: String) -> Self {
        Self::message(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let fault = Fault::status(503)
            .with_message("upstream unavailable")
            .with_stack("at step()");

        assert_eq!(fault.status, Some(503));
        assert_eq!(fault.message_text(), "upstream unavailable");
        assert_eq!(fault.stack.as_deref(), Some("at step()"));
    }

    #[test]
    fn test_from_json_prefers_status_code_over_status_over_code() {
        let fault = Fault::from_json(&json!({"statusCode": 429, "status": 500, "code": 401}));
        assert_eq!(fault.status, Some(429));

        let fault = Fault::from_json(&json!({"status": 500, "code": 401}));
        assert_eq!(fault.status, Some(500));

        let fault = Fault::from_json(&json!({"code": 401}));
        assert_eq!(fault.status, Some(401));
    }

    #[test]
    fn test_from_json_skips_zero_and_non_numeric_codes() {
        let fault = Fault::from_json(&json!({"statusCode": 0, "code": "ETIMEDOUT"}));
        assert_eq!(fault.status, None);

        let fault = Fault::from_json(&json!({"code": "ECONNRESET", "status": 502.0}));
        assert_eq!(fault.status, Some(502));
    }

    #[test]
    fn test_from_json_non_object_values() {
        assert_eq!(
            Fault::from_json(&json!("socket hang up")).message_text(),
            "socket hang up"
        );
        assert_eq!(Fault::from_json(&json!(null)), Fault::new());
        assert_eq!(Fault::from_json(&json!(42)).message_text(), "42");
    }

    #[test]
    fn test_deserialize_goes_through_from_json() {
        let fault: Fault =
            serde_json::from_str(r#"{"message":"ETIMEDOUT","stack":"trace","code":"x"}"#).unwrap();
        assert_eq!(fault.message.as_deref(), Some("ETIMEDOUT"));
        assert_eq!(fault.stack.as_deref(), Some("trace"));
        assert_eq!(fault.status, None);
    }

    #[test]
    fn test_from_error_uses_display() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "connection timeout");
        assert_eq!(Fault::from_error(&io).message_text(), "connection timeout");
    }

    #[test]
    fn test_display() {
        assert_eq!(Fault::message("boom").to_string(), "boom");
        assert_eq!(Fault::status(404).to_string(), "status 404");
        assert_eq!(Fault::new().to_string(), "unknown fault");
    }
}
