use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::SessionId;

/// One stored exchange returned by `GET /history/:session_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// What the user sent.
    pub user_message: String,

    /// What the assistant answered, as Markdown.
    #[serde(default, alias = "ai_response")]
    pub gemini_response: String,

    /// When the exchange was stored.
    #[serde(
        default,
        with = "crate::utils::time::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<OffsetDateTime>,

    /// The model that produced the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
}

impl HistoryEntry {
    /// Create an entry with no timestamp or model.
    pub fn new(user_message: impl Into<String>, gemini_response: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            gemini_response: gemini_response.into(),
            timestamp: None,
            model_used: None,
        }
    }
}

/// Response body of `GET /history/:session_id`, oldest exchange first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHistory {
    /// The session the history belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,

    /// Stored exchanges.
    #[serde(default)]
    pub messages: Vec<HistoryEntry>,

    /// Total number of stored exchanges, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn deserialize_full_history() {
        let history: ChatHistory = serde_json::from_value(json!({
            "session_id": "s1",
            "messages": [
                {
                    "user_message": "hi",
                    "gemini_response": "Hello!",
                    "timestamp": "2024-05-01T10:20:30.500000",
                    "model_used": "gemini-2.0-flash-001"
                },
                {"user_message": "bye", "gemini_response": "Goodbye."}
            ],
            "total_count": 2
        }))
        .unwrap();

        assert_eq!(history.session_id, Some(SessionId::new("s1")));
        assert_eq!(history.messages.len(), 2);
        assert_eq!(
            history.messages[0].timestamp,
            Some(datetime!(2024-05-01 10:20:30.5 UTC))
        );
        assert_eq!(history.messages[1], HistoryEntry::new("bye", "Goodbye."));
        assert_eq!(history.total_count, Some(2));
    }

    #[test]
    fn accepts_legacy_response_field() {
        let entry: HistoryEntry =
            serde_json::from_value(json!({"user_message": "q", "ai_response": "a"})).unwrap();
        assert_eq!(entry.gemini_response, "a");
    }

    #[test]
    fn minimal_history() {
        let history: ChatHistory = serde_json::from_value(json!({"messages": []})).unwrap();
        assert!(history.messages.is_empty());
        assert!(history.session_id.is_none());
    }
}
