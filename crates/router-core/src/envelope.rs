//! Result envelopes returned by every operation

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::OperationError;

const ERROR_KEY: &str = "error";

/// Uniform result mapping.
///
/// An envelope is exactly one of: a success payload under a domain key
/// (`{"devices": ...}`), a mutation outcome (`{"success": bool, "message": ..}`),
/// an informational message (`{"message": ..}`) or an error (`{"error": ..}`).
/// The `error` key never appears next to any other key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    /// Success payload wrapped under `key`
    pub fn success(key: &str, payload: Value) -> Self {
        debug_assert_ne!(key, ERROR_KEY);
        let mut map = Map::new();
        map.insert(key.to_string(), payload);
        Envelope(map)
    }

    /// Outcome of a side-effecting operation
    pub fn mutation(success: bool, message: impl Into<String>) -> Self {
        Envelope::success("success", Value::Bool(success)).with("message", message.into())
    }

    /// Neutral message for an empty result
    pub fn info(message: impl Into<String>) -> Self {
        Envelope::success("message", Value::String(message.into()))
    }

    pub fn error(message: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert(ERROR_KEY.to_string(), Value::String(message.into()));
        Envelope(map)
    }

    /// Add a descriptive key to a non-error envelope
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        debug_assert!(!self.is_error() && key != ERROR_KEY);
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.0.contains_key(ERROR_KEY)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.0.get(ERROR_KEY).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<OperationError> for Envelope {
    fn from(err: OperationError) -> Self {
        Envelope::error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_wraps_payload_under_key() {
        let env = Envelope::success("wan", json!({"status": "connected"}));
        assert_eq!(env.into_value(), json!({"wan": {"status": "connected"}}));
    }

    #[test]
    fn mutation_carries_success_flag() {
        let env = Envelope::mutation(false, "Router did not confirm LED on");
        assert_eq!(env.get("success"), Some(&json!(false)));
        assert!(!env.is_error());
    }

    #[test]
    fn error_envelope_has_only_error_key() {
        let env: Envelope = OperationError::Validation("bad band".to_string()).into();
        assert_eq!(env.as_map().len(), 1);
        assert_eq!(env.error_message(), Some("bad band"));
    }
}
