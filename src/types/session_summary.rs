use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::SessionId;

/// A stored session as listed by `GET /sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// The session identifier.
    pub session_id: SessionId,

    /// When the session was first seen.
    #[serde(with = "crate::utils::time")]
    pub created_at: OffsetDateTime,

    /// When the session last exchanged a message.
    #[serde(with = "crate::utils::time")]
    pub last_activity: OffsetDateTime,

    /// Number of stored exchanges.
    #[serde(default)]
    pub message_count: u64,
}

/// Response body of `GET /sessions`, most recently active first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionList {
    /// The sessions.
    #[serde(default)]
    pub sessions: Vec<SessionSummary>,

    /// Number of sessions.
    #[serde(default)]
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn deserialize_session_list() {
        let list: SessionList = serde_json::from_value(json!({
            "sessions": [{
                "session_id": "s1",
                "created_at": "2024-05-01T10:00:00",
                "last_activity": "2024-05-01T11:30:00+00:00",
                "message_count": 4
            }],
            "count": 1
        }))
        .unwrap();

        assert_eq!(list.count, 1);
        let session = &list.sessions[0];
        assert_eq!(session.session_id.as_str(), "s1");
        assert_eq!(session.created_at, datetime!(2024-05-01 10:00 UTC));
        assert_eq!(session.last_activity, datetime!(2024-05-01 11:30 UTC));
        assert_eq!(session.message_count, 4);
    }
}
