use serde::{Deserialize, Serialize};

/// Response body of the single-shot `POST /api/chat` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// The generated text; empty when `error` is set.
    #[serde(default)]
    pub response: String,

    /// An application-level failure reported by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// The model that produced the reply, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
}

impl ChatReply {
    /// A successful reply.
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            ..Self::default()
        }
    }

    /// A reply carrying an application-level error.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialize_success() {
        let reply: ChatReply = serde_json::from_value(json!({
            "response": "**hi**",
            "error": null,
            "model_used": "gemini-2.0-flash-001"
        }))
        .unwrap();
        assert_eq!(reply.response, "**hi**");
        assert!(reply.error.is_none());
        assert_eq!(reply.model_used.as_deref(), Some("gemini-2.0-flash-001"));
    }

    #[test]
    fn deserialize_error_only() {
        let reply: ChatReply = serde_json::from_value(json!({"error": "quota"})).unwrap();
        assert_eq!(reply, ChatReply::failed("quota"));
    }
}
