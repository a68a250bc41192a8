//! Log records as emitted by the daemon's tracing layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One line of daemon log output.
///
/// Structured lines follow the tracing-subscriber JSON layout; anything that
/// does not parse as such is kept verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogRecord {
    Structured(StructuredLog),
    Raw(String),
}

/// A tracing JSON record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructuredLog {
    pub timestamp: String,
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Event fields in emission order. The `message` key holds the log text.
    #[serde(default)]
    pub fields: Map<String, Value>,
    /// The innermost span, when the layer records it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Value>,
    /// All entered spans, outermost first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spans: Option<Vec<Value>>,
}

impl StructuredLog {
    /// The `message` field, if present and textual.
    pub fn message(&self) -> Option<&str> {
        self.fields.get("message").and_then(Value::as_str)
    }

    /// Fields other than `message`, in emission order.
    pub fn extra_fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter().filter(|(key, _)| key.as_str() != "message")
    }
}

impl LogRecord {
    /// Text suitable for a single-line rendering.
    pub fn text(&self) -> &str {
        match self {
            LogRecord::Raw(line) => line,
            LogRecord::Structured(log) => log.message().unwrap_or_default(),
        }
    }

    /// Level of a structured record; raw lines have none.
    pub fn level(&self) -> Option<&str> {
        match self {
            LogRecord::Raw(_) => None,
            LogRecord::Structured(log) => Some(log.level.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_and_extra_fields() {
        let log: StructuredLog = serde_json::from_value(serde_json::json!({
            "timestamp": "2024-01-01T00:00:00Z",
            "level": "INFO",
            "fields": {"message": "hello", "swap_id": "abc"},
        }))
        .expect("deserialize");

        assert_eq!(log.message(), Some("hello"));
        let extras: Vec<_> = log.extra_fields().map(|(k, _)| k.as_str()).collect();
        assert_eq!(extras, vec!["swap_id"]);
    }

    #[test]
    fn test_raw_record_text() {
        let record = LogRecord::Raw("plain line".to_string());
        assert_eq!(record.text(), "plain line");
        assert_eq!(record.level(), None);
    }
}
