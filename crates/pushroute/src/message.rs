//! Inbound push messages.
//!
//! Only one field of the payload matters here: the data entry naming the
//! incident to open. Title and body belong to the notification display
//! system and are kept for logging only.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::MessageConfig;
use crate::error::{Error, Result};

/// App lifecycle state at the moment a message is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// The message started the app process.
    Terminated,
    /// The process was alive but the UI was not focused.
    Background,
    /// The UI was focused when the message arrived.
    Foreground,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Terminated => write!(f, "terminated"),
            Self::Background => write!(f, "background"),
            Self::Foreground => write!(f, "foreground"),
        }
    }
}

/// Display part of a push message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Notification body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// A push message as delivered by the messaging transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// Transport-assigned message identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Display payload, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    /// Arbitrary key-value data.
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
}

impl InboundMessage {
    /// Build a data-only message with a single string entry.
    #[must_use]
    pub fn with_data(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut data = BTreeMap::new();
        data.insert(key.into(), Value::String(value.into()));
        Self {
            data,
            ..Self::default()
        }
    }

    /// Parse a message from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns an error if `raw` is not a valid message object.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Notification title, if present.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.notification.as_ref()?.title.as_deref()
    }
}

/// Pulls the target identifier out of a message's data section.
#[derive(Debug, Clone)]
pub struct TargetExtractor {
    field: String,
    pattern: Regex,
}

impl TargetExtractor {
    /// Create an extractor reading `field` and accepting values that match `pattern`.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regex.
    pub fn new(field: impl Into<String>, pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| Error::ConfigValidation {
            message: format!("invalid target pattern {pattern}: {e}"),
        })?;
        Ok(Self {
            field: field.into(),
            pattern,
        })
    }

    /// Create an extractor from the message configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured pattern is not a valid regex.
    pub fn from_config(config: &MessageConfig) -> Result<Self> {
        Self::new(config.target_field.clone(), &config.target_pattern)
    }

    /// Name of the data field read.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Extract the target identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingTarget`] if the field is absent and
    /// [`Error::MalformedTarget`] if it is not a usable identifier.
    pub fn extract(&self, message: &InboundMessage) -> Result<String> {
        let value = message
            .data
            .get(&self.field)
            .ok_or_else(|| Error::MissingTarget {
                field: self.field.clone(),
            })?;

        let raw = match value {
            Value::String(s) => s.trim(),
            Value::Null => {
                return Err(Error::MissingTarget {
                    field: self.field.clone(),
                })
            }
            other => {
                return Err(Error::malformed_target(
                    &self.field,
                    format!("expected a string, found {}", json_kind(other)),
                ))
            }
        };

        if raw.is_empty() {
            return Err(Error::malformed_target(&self.field, "empty value"));
        }
        if !self.pattern.is_match(raw) {
            return Err(Error::malformed_target(
                &self.field,
                format!("'{raw}' does not match {}", self.pattern.as_str()),
            ));
        }

        Ok(raw.to_string())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> TargetExtractor {
        TargetExtractor::from_config(&MessageConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_transport_payload() {
        let raw = r#"{
            "messageId": "0:1700000000%abc",
            "notification": {"title": "Flood reported", "body": "Tap to view"},
            "data": {"incidentId": "42", "sound": "default"}
        }"#;
        let message = InboundMessage::from_json(raw).unwrap();

        assert_eq!(message.message_id.as_deref(), Some("0:1700000000%abc"));
        assert_eq!(message.title(), Some("Flood reported"));
        assert_eq!(message.data["incidentId"], "42");
    }

    #[test]
    fn test_parse_data_only_payload() {
        let message = InboundMessage::from_json(r#"{"data":{"incidentId":"7"}}"#).unwrap();
        assert!(message.notification.is_none());
        assert!(message.title().is_none());
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(InboundMessage::from_json("[1,2]").is_err());
    }

    #[test]
    fn test_extract_target() {
        let message = InboundMessage::with_data("incidentId", "42");
        assert_eq!(extractor().extract(&message).unwrap(), "42");
    }

    #[test]
    fn test_extract_trims_whitespace() {
        let message = InboundMessage::with_data("incidentId", "  incident_42 ");
        assert_eq!(extractor().extract(&message).unwrap(), "incident_42");
    }

    #[test]
    fn test_extract_missing_field() {
        let message = InboundMessage::with_data("title", "hello");
        let err = extractor().extract(&message).unwrap_err();
        assert!(matches!(err, Error::MissingTarget { .. }));
    }

    #[test]
    fn test_extract_null_is_missing() {
        let message = InboundMessage::from_json(r#"{"data":{"incidentId":null}}"#).unwrap();
        let err = extractor().extract(&message).unwrap_err();
        assert!(matches!(err, Error::MissingTarget { .. }));
    }

    #[test]
    fn test_extract_non_string() {
        let message = InboundMessage::from_json(r#"{"data":{"incidentId":42}}"#).unwrap();
        let err = extractor().extract(&message).unwrap_err();
        assert!(err.to_string().contains("found a number"));
    }

    #[test]
    fn test_extract_empty() {
        let message = InboundMessage::with_data("incidentId", "   ");
        let err = extractor().extract(&message).unwrap_err();
        assert!(err.to_string().contains("empty value"));
    }

    #[test]
    fn test_extract_pattern_mismatch() {
        let strict = TargetExtractor::new("incidentId", r"^[A-Za-z0-9_-]{1,128}$").unwrap();
        let message = InboundMessage::with_data("incidentId", "../../etc/passwd");
        let err = strict.extract(&message).unwrap_err();
        assert!(matches!(err, Error::MalformedTarget { .. }));
    }

    #[test]
    fn test_default_extractor_keeps_opaque_ids() {
        for id in ["incident:42", "2025.07.25-7", "事件42", "a/b c"] {
            let message = InboundMessage::with_data("incidentId", id);
            assert_eq!(extractor().extract(&message).unwrap(), id);
        }
    }

    #[test]
    fn test_custom_field() {
        let extractor = TargetExtractor::new("reportId", ".+").unwrap();
        assert_eq!(extractor.field(), "reportId");

        let message = InboundMessage::with_data("reportId", "r-1");
        assert_eq!(extractor.extract(&message).unwrap(), "r-1");
    }

    #[test]
    fn test_invalid_pattern() {
        let err = TargetExtractor::new("incidentId", "[invalid").unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_lifecycle_state_display() {
        assert_eq!(LifecycleState::Terminated.to_string(), "terminated");
        assert_eq!(LifecycleState::Background.to_string(), "background");
        assert_eq!(LifecycleState::Foreground.to_string(), "foreground");
    }
}
