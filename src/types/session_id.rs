use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque, server-assigned conversation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an identifier issued by the backend.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Response body of `POST /chat/session` and `POST /chat/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCreated {
    /// The freshly issued session.
    pub session_id: SessionId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_created_deserialization() {
        let created: SessionCreated =
            serde_json::from_value(json!({"session_id": "s1"})).unwrap();
        assert_eq!(created.session_id, SessionId::new("s1"));
        assert_eq!(created.session_id.to_string(), "s1");
    }

    #[test]
    fn session_id_is_transparent() {
        let id = SessionId::from("abc");
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("abc"));
    }
}
