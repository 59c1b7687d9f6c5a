use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

/// One decoded push-stream payload.
///
/// The backend sends JSON objects carrying one of `error`, `content` or
/// `done`.  They are checked in that order, and each counts only when its
/// value is truthy: not `null`, `false`, `0` or `""`.  A non-string `error`
/// or `content` is shown as its JSON text.  An object with none of them
/// decodes to [`StreamEvent::Ignored`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// An incremental piece of assistant text.
    Content(String),
    /// The backend reported a failure; the stream is over.
    Error(String),
    /// The reply is complete.
    Done,
    /// A well-formed payload that carries nothing actionable.
    Ignored,
}

#[derive(Deserialize)]
struct RawStreamEvent {
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    done: Option<Value>,
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl StreamEvent {
    /// Decode the `data` of a server-sent event.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if `data` is not a JSON object.
    pub fn parse(data: &str) -> Result<Self> {
        let raw: RawStreamEvent = serde_json::from_str(data).map_err(|e| {
            Error::serialization(
                format!("Failed to parse stream event {data:?}: {e}"),
                Some(Box::new(e)),
            )
        })?;
        if let Some(error) = raw.error.filter(truthy) {
            Ok(StreamEvent::Error(text(error)))
        } else if let Some(content) = raw.content.filter(truthy) {
            Ok(StreamEvent::Content(text(content)))
        } else if raw.done.as_ref().is_some_and(truthy) {
            Ok(StreamEvent::Done)
        } else {
            Ok(StreamEvent::Ignored)
        }
    }

    /// Returns true if this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Error(_) | StreamEvent::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_shape() {
        assert_eq!(
            StreamEvent::parse(r#"{"content": "He"}"#).unwrap(),
            StreamEvent::Content("He".to_string())
        );
        assert_eq!(
            StreamEvent::parse(r#"{"error": "quota exceeded"}"#).unwrap(),
            StreamEvent::Error("quota exceeded".to_string())
        );
        assert_eq!(StreamEvent::parse(r#"{"done": true}"#).unwrap(), StreamEvent::Done);
    }

    #[test]
    fn error_wins_over_content() {
        let event = StreamEvent::parse(r#"{"content": "x", "error": "boom"}"#).unwrap();
        assert_eq!(event, StreamEvent::Error("boom".to_string()));
    }

    #[test]
    fn empty_or_unknown_payloads_are_ignored() {
        assert_eq!(StreamEvent::parse(r#"{"content": ""}"#).unwrap(), StreamEvent::Ignored);
        assert_eq!(StreamEvent::parse(r#"{"done": false}"#).unwrap(), StreamEvent::Ignored);
        assert_eq!(
            StreamEvent::parse(r#"{"usage": {"tokens": 3}}"#).unwrap(),
            StreamEvent::Ignored
        );
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let err = StreamEvent::parse("not json").unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn terminal_events() {
        assert!(StreamEvent::Done.is_terminal());
        assert!(StreamEvent::Error("x".to_string()).is_terminal());
        assert!(!StreamEvent::Content("x".to_string()).is_terminal());
        assert!(!StreamEvent::Ignored.is_terminal());
    }

    #[test]
    fn loosely_typed_fields() {
        assert_eq!(
            StreamEvent::parse(r#"{"content": 123}"#).unwrap(),
            StreamEvent::Content("123".to_string())
        );
        assert_eq!(StreamEvent::parse(r#"{"done": 1}"#).unwrap(), StreamEvent::Done);
        assert_eq!(StreamEvent::parse(r#"{"done": "yes"}"#).unwrap(), StreamEvent::Done);
        assert_eq!(StreamEvent::parse(r#"{"done": 0}"#).unwrap(), StreamEvent::Ignored);
        assert_eq!(
            StreamEvent::parse(r#"{"error": "", "content": "still here"}"#).unwrap(),
            StreamEvent::Content("still here".to_string())
        );
        assert_eq!(
            StreamEvent::parse(r#"{"error": null, "content": null, "done": true}"#).unwrap(),
            StreamEvent::Done
        );
        assert_eq!(
            StreamEvent::parse(r#"{"error": {"code": 7}}"#).unwrap(),
            StreamEvent::Error(r#"{"code":7}"#.to_string())
        );
    }
}
