use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Longest message the backend accepts, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Request body of `POST /chat/stream` and `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
}

impl ChatRequest {
    /// Build a request from user input, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the trimmed message is empty or longer than
    /// [`MAX_MESSAGE_CHARS`].
    pub fn new(message: &str) -> Result<Self> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::validation(
                "message must not be empty",
                Some("message".to_string()),
            ));
        }
        let chars = message.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(Error::validation(
                format!("message is {chars} characters; the limit is {MAX_MESSAGE_CHARS}"),
                Some("message".to_string()),
            ));
        }
        Ok(Self {
            message: message.to_string(),
        })
    }
}
